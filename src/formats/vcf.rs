use crate::types::RawVariant;
use crate::{Error, Result};
use noodles::vcf;
use std::io::BufRead;
use std::path::Path;

/// Streams variants out of a VCF file one record at a time.
pub struct VcfSource {
    reader: vcf::io::Reader<Box<dyn BufRead>>,
    header: vcf::Header,
    record: vcf::variant::RecordBuf,
    done: bool,
}

impl VcfSource {
    /// Open a VCF; compression is detected from the file extension.
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = vcf::io::reader::Builder::default().build_from_path(path)?;
        let header = reader.read_header()?;

        Ok(Self {
            reader,
            header,
            record: vcf::variant::RecordBuf::default(),
            done: false,
        })
    }

    fn convert(record: &vcf::variant::RecordBuf) -> Result<RawVariant> {
        let position = record
            .variant_start()
            .map(|p| usize::from(p) as u64)
            .ok_or(Error::InvalidCoordinate(0))?;

        let ids: Vec<&str> = record.ids().as_ref().iter().map(String::as_str).collect();
        let id = if ids.is_empty() {
            ".".to_string()
        } else {
            ids.join(";")
        };

        Ok(RawVariant {
            chromosome: record.reference_sequence_name().to_string(),
            position,
            id,
            reference: record.reference_bases().to_string(),
            alternates: record.alternate_bases().as_ref().to_vec(),
        })
    }
}

impl Iterator for VcfSource {
    type Item = Result<RawVariant>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read_record_buf(&self.header, &mut self.record) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => Some(Self::convert(&self.record)),
            Err(e) => {
                // the stream is not restartable after a read error
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VCF: &str = "##fileformat=VCFv4.3
##contig=<ID=1,length=248956422>
##contig=<ID=X,length=156040895>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t100\trs1\tA\tG\t.\t.\t.
1\t200\trs2\tC\tT,G\t.\t.\t.
X\t300\t.\tG\t.\t.\t.\t.
";

    #[test]
    fn test_reads_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.vcf");
        std::fs::write(&path, VCF).unwrap();

        let variants: Vec<_> = VcfSource::open(&path)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(variants.len(), 3);
        assert_eq!(
            variants[0],
            RawVariant {
                chromosome: "1".to_string(),
                position: 100,
                id: "rs1".to_string(),
                reference: "A".to_string(),
                alternates: vec!["G".to_string()],
            }
        );
        assert_eq!(variants[1].alternates, vec!["T", "G"]);
        assert_eq!(variants[2].chromosome, "X");
        assert_eq!(variants[2].id, ".");
        assert!(variants[2].alternates.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(VcfSource::open(&dir.path().join("missing.vcf")).is_err());
    }
}
