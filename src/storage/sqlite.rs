use super::{BinnedSnp, IntegrityWarning, SnpSink};
use crate::binning::Bin;
use crate::types::Snp;
use crate::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Row, params_from_iter};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Instant;

const SQL_CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS meta_info (
        meta_info_key INTEGER,
        meta_key TEXT NOT NULL,
        meta_value TEXT NOT NULL,
        species_id TEXT NOT NULL,
        PRIMARY KEY (meta_info_key)
    )",
    "CREATE TABLE IF NOT EXISTS snps (
        chrom TEXT NOT NULL,
        pos INTEGER NOT NULL,
        snp_id TEXT NOT NULL,
        ref TEXT,
        alt TEXT,
        bin INTEGER NOT NULL
    )",
];

const SQL_INDICES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_snps_chrom ON snps (chrom ASC)",
    "CREATE INDEX IF NOT EXISTS idx_snps_pos ON snps (pos ASC)",
    "CREATE INDEX IF NOT EXISTS idx_snps_id ON snps (snp_id ASC)",
    "CREATE INDEX IF NOT EXISTS idx_snps_bin ON snps (bin ASC)",
];

/// Number of offending keys reported per integrity check.
const INTEGRITY_EXAMPLES: usize = 10;

const SQL_DUPLICATE_IDS: &str = "SELECT snp_id, count(1)
      FROM snps
     GROUP BY snp_id
    HAVING count(1) > 1
     LIMIT ?1";

const SQL_DUPLICATE_POSITIONS: &str = "SELECT chrom, pos, count(1)
      FROM snps
     GROUP BY chrom, pos
    HAVING count(1) > 1
     LIMIT ?1";

const SQL_META: &str = "SELECT DISTINCT meta_key, meta_value, species_id
      FROM meta_info
     WHERE species_id = ?1
     ORDER BY meta_key";

/// A single SNP store backed by one SQLite file.
///
/// The handle owns its connection; dropping it closes the file.
pub struct SqliteStore {
    connection: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) a store for loading.
    pub fn create(path: &Path) -> Result<Self> {
        let connection = Connection::open(path)?;
        // the file is only promoted after a successful build, so durability
        // during the load is not needed
        connection.execute_batch("PRAGMA journal_mode = OFF; PRAGMA synchronous = OFF;")?;
        Ok(Self {
            connection,
            path: path.to_path_buf(),
        })
    }

    /// Open a finalized store for querying.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(path, flags)?;
        Ok(Self {
            connection,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All SNPs whose id is in `ids`, ordered by chromosome then position.
    ///
    /// The ids are loaded into a temporary keyed table so the lookup is one
    /// join rather than one query per id.
    pub fn snps_by_ids(&self, ids: &[String]) -> Result<Vec<Snp>> {
        self.connection.execute_batch(
            "CREATE TEMPORARY TABLE IF NOT EXISTS lookup_ids (
                query_id TEXT,
                PRIMARY KEY (query_id)
            );
            DELETE FROM temp.lookup_ids;",
        )?;

        {
            let mut insert = self
                .connection
                .prepare("INSERT OR IGNORE INTO temp.lookup_ids VALUES (?1)")?;
            for id in ids {
                insert.execute([id])?;
            }
        }

        let mut statement = self.connection.prepare(
            "SELECT s.chrom, s.pos, s.snp_id, s.ref, s.alt
               FROM snps s
              WHERE s.snp_id IN (SELECT query_id FROM temp.lookup_ids)
              ORDER BY s.chrom, s.pos",
        )?;
        let snps = statement
            .query_map([], snp_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        self.connection.execute_batch("DROP TABLE temp.lookup_ids")?;
        Ok(snps)
    }

    /// SNPs on `chromosome` with `start <= pos <= end` whose bin lies in one
    /// of `bins`, ordered by position and capped at `limit`.
    pub fn snps_in_region(
        &self,
        chromosome: &str,
        start: u64,
        end: u64,
        bins: &[RangeInclusive<Bin>],
        limit: usize,
    ) -> Result<Vec<Snp>> {
        let (sql, values) = region_query(chromosome, start, end, bins, limit)?;
        tracing::debug!("query: {}", sql);
        tracing::debug!("parameters: {:?}", values);

        let mut statement = self.connection.prepare(&sql)?;
        let snps = statement
            .query_map(params_from_iter(values.iter()), snp_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(snps)
    }

    /// `(meta_key, meta_value)` rows stored for `species`.
    pub fn meta(&self, species: &str) -> Result<Vec<(String, String)>> {
        let mut statement = self.connection.prepare(SQL_META)?;
        let rows = statement
            .query_map([species], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Every metadata row, for the post-build summary.
    pub fn all_meta(&self) -> Result<Vec<(String, String, String)>> {
        let mut statement = self.connection.prepare(
            "SELECT DISTINCT meta_key, meta_value, species_id FROM meta_info ORDER BY meta_key",
        )?;
        let rows = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Number of stored SNPs.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .connection
            .query_row("SELECT count(1) FROM snps", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn snp_from_row(row: &Row<'_>) -> rusqlite::Result<Snp> {
    let position: i64 = row.get(1)?;
    Ok(Snp {
        chromosome: row.get(0)?,
        position: position as u64,
        id: row.get(2)?,
        reference: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        alternate: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}

/// Build the region SQL. Bins are contiguous within a level, so the bin set
/// is expressed as one `BETWEEN` per level instead of one parameter per bin.
fn region_query(
    chromosome: &str,
    start: u64,
    end: u64,
    bins: &[RangeInclusive<Bin>],
    limit: usize,
) -> Result<(String, Vec<Value>)> {
    let bound = |p: u64| i64::try_from(p).map_err(|_| Error::InvalidCoordinate(p));
    let mut values = vec![
        Value::Text(chromosome.to_string()),
        Value::Integer(bound(start)?),
        Value::Integer(bound(end)?),
    ];

    let mut sql = String::from(
        "SELECT s.chrom, s.pos, s.snp_id, s.ref, s.alt
           FROM snps s
          WHERE s.chrom = ?
            AND s.pos >= ?
            AND s.pos <= ?",
    );

    if !bins.is_empty() {
        let clauses = bins
            .iter()
            .map(|range| {
                values.push(Value::Integer(i64::from(*range.start())));
                values.push(Value::Integer(i64::from(*range.end())));
                "s.bin BETWEEN ? AND ?"
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        sql.push_str(&format!("\n            AND ({})", clauses));
    }

    sql.push_str("\n          ORDER BY s.pos\n          LIMIT ?");
    values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

    Ok((sql, values))
}

impl SnpSink for SqliteStore {
    fn create_schema(&mut self) -> Result<()> {
        tracing::info!("generating tables in {}", self.path.display());
        for sql in SQL_CREATE_TABLES {
            tracing::debug!("{}", sql);
            self.connection.execute(sql, [])?;
        }
        Ok(())
    }

    fn insert_batch(&mut self, batch: &[BinnedSnp]) -> Result<()> {
        let start = Instant::now();
        tracing::debug!("inserting {} snps", batch.len());

        let transaction = self.connection.transaction()?;
        {
            let mut insert =
                transaction.prepare("INSERT INTO snps VALUES (?1, ?2, ?3, ?4, ?5, ?6)")?;
            for row in batch {
                insert.execute((
                    &row.snp.chromosome,
                    row.snp.position as i64,
                    &row.snp.id,
                    &row.snp.reference,
                    &row.snp.alternate,
                    row.bin,
                ))?;
            }
        }
        transaction.commit()?;

        tracing::info!("{} snps inserted in {:?}", batch.len(), start.elapsed());
        Ok(())
    }

    fn create_indices(&mut self) -> Result<()> {
        for sql in SQL_INDICES {
            tracing::debug!("{}", sql);
            self.connection.execute(sql, [])?;
        }
        Ok(())
    }

    fn integrity_checks(&mut self) -> Result<Vec<IntegrityWarning>> {
        let limit = INTEGRITY_EXAMPLES as i64;
        let mut warnings = Vec::new();

        let mut statement = self.connection.prepare(SQL_DUPLICATE_IDS)?;
        let ids = statement.query_map([limit], |row| {
            let count: i64 = row.get(1)?;
            Ok(IntegrityWarning::DuplicateId {
                id: row.get(0)?,
                count: count as u64,
            })
        })?;
        for warning in ids {
            warnings.push(warning?);
        }

        let mut statement = self.connection.prepare(SQL_DUPLICATE_POSITIONS)?;
        let positions = statement.query_map([limit], |row| {
            let position: i64 = row.get(1)?;
            let count: i64 = row.get(2)?;
            Ok(IntegrityWarning::DuplicatePosition {
                chromosome: row.get(0)?,
                position: position as u64,
                count: count as u64,
            })
        })?;
        for warning in positions {
            warnings.push(warning?);
        }

        Ok(warnings)
    }

    fn write_meta(&mut self, species: &str, entries: &[(&str, String)]) -> Result<()> {
        let transaction = self.connection.transaction()?;
        {
            let mut insert =
                transaction.prepare("INSERT INTO meta_info VALUES (NULL, ?1, ?2, ?3)")?;
            for (key, value) in entries {
                insert.execute((key, value, species))?;
            }
        }
        transaction.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::{position_bin, query_bin_ranges};
    use tempfile::TempDir;

    fn binned(chromosome: &str, position: u64, id: &str) -> BinnedSnp {
        BinnedSnp {
            snp: Snp {
                chromosome: chromosome.to_string(),
                position,
                id: id.to_string(),
                reference: "A".to_string(),
                alternate: "G".to_string(),
            },
            bin: position_bin(position).unwrap(),
        }
    }

    fn loaded_store(dir: &TempDir, rows: &[BinnedSnp]) -> SqliteStore {
        let path = dir.path().join("snps.test.db3");
        let mut store = SqliteStore::create(&path).unwrap();
        store.create_schema().unwrap();
        store.insert_batch(rows).unwrap();
        store.create_indices().unwrap();
        store
    }

    #[test]
    fn test_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStore::create(&dir.path().join("a.db3")).unwrap();
        store.create_schema().unwrap();
        store.create_schema().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_region_query_orders_and_limits() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<_> = (1..=10)
            .rev()
            .map(|i| binned("1", i * 100_000, &format!("rs{}", i)))
            .collect();
        let store = loaded_store(&dir, &rows);

        let bins = query_bin_ranges(1, 1_000_000_001).unwrap();
        let snps = store
            .snps_in_region("1", 1, 1_000_000_000, &bins, 5)
            .unwrap();
        assert_eq!(snps.len(), 5);
        let positions: Vec<_> = snps.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![100_000, 200_000, 300_000, 400_000, 500_000]);
    }

    #[test]
    fn test_region_query_bounds_inclusive() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            binned("1", 99, "rs1"),
            binned("1", 100, "rs2"),
            binned("1", 200, "rs3"),
            binned("1", 201, "rs4"),
            binned("2", 150, "rs5"),
        ];
        let store = loaded_store(&dir, &rows);

        let bins = query_bin_ranges(100, 201).unwrap();
        let ids: Vec<_> = store
            .snps_in_region("1", 100, 200, &bins, 100)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["rs2", "rs3"]);
    }

    #[test]
    fn test_ids_lookup() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            binned("2", 50, "rs2"),
            binned("1", 500, "rs1"),
            binned("1", 100, "rs3"),
        ];
        let store = loaded_store(&dir, &rows);

        let ids = vec!["rs2".to_string(), "rs1".to_string(), "rs1".to_string()];
        let snps = store.snps_by_ids(&ids).unwrap();
        let found: Vec<_> = snps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(found, vec!["rs1", "rs2"]);

        // the temporary table is dropped, so a second lookup starts clean
        let snps = store.snps_by_ids(&["rs3".to_string()]).unwrap();
        assert_eq!(snps.len(), 1);
    }

    #[test]
    fn test_integrity_checks() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            binned("1", 100, "rs1"),
            binned("1", 100, "rs2"),
            binned("1", 300, "rs1"),
        ];
        let mut store = loaded_store(&dir, &rows);

        let warnings = store.integrity_checks().unwrap();
        assert!(warnings.contains(&IntegrityWarning::DuplicateId {
            id: "rs1".to_string(),
            count: 2
        }));
        assert!(warnings.contains(&IntegrityWarning::DuplicatePosition {
            chromosome: "1".to_string(),
            position: 100,
            count: 2
        }));
    }

    #[test]
    fn test_meta_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = loaded_store(&dir, &[]);
        store
            .write_meta(
                "Mm",
                &[("version", "91".to_string()), ("assembly", "GRCm38".to_string())],
            )
            .unwrap();

        let meta = store.meta("Mm").unwrap();
        assert_eq!(
            meta,
            vec![
                ("assembly".to_string(), "GRCm38".to_string()),
                ("version".to_string(), "91".to_string()),
            ]
        );
        assert!(store.meta("Hs").unwrap().is_empty());
    }

    #[test]
    fn test_region_sql_uses_level_ranges() {
        let bins = query_bin_ranges(1, 100).unwrap();
        let (sql, values) = region_query("1", 1, 99, &bins, 10).unwrap();
        assert_eq!(sql.matches("BETWEEN").count(), bins.len());
        assert_eq!(values.len(), 3 + bins.len() * 2 + 1);
    }

    #[test]
    fn test_region_sql_rejects_unrepresentable_bound() {
        assert!(matches!(
            region_query("1", 1, u64::MAX, &[], 10),
            Err(Error::InvalidCoordinate(u64::MAX))
        ));
    }
}
