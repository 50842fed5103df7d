use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::record::{Dataset, MovieRecord};

const BOM: &str = "\u{feff}";

pub const HEADERS: [&str; 8] = [
    "title",
    "categories",
    "region",
    "duration",
    "releaseDate",
    "score",
    "coverUrl",
    "detailUrl",
];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no dataset at {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Write a BOM, the header row, then one row per record.
/// The header is written even when there are no records.
pub fn write_records<'a, W: Write>(
    mut out: W,
    records: impl IntoIterator<Item = &'a MovieRecord>,
) -> Result<(), csv::Error> {
    out.write_all(BOM.as_bytes())?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(HEADERS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_records<R: Read>(mut input: R) -> Result<Vec<MovieRecord>, csv::Error> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    let body = text.strip_prefix(BOM).unwrap_or(&text);
    csv::Reader::from_reader(body.as_bytes())
        .deserialize()
        .collect()
}

pub fn save<'a>(path: &Path, records: impl IntoIterator<Item = &'a MovieRecord>) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = fs::File::create(path).map_err(io_err)?;
    write_records(io::BufWriter::new(file), records).map_err(|source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Saved dataset");
    Ok(())
}

pub fn load(path: &Path) -> Result<Dataset, StoreError> {
    if !path.exists() {
        return Err(StoreError::Missing {
            path: path.to_path_buf(),
        });
    }
    let file = fs::File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_records(io::BufReader::new(file)).map_err(|source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), count = records.len(), "Loaded dataset");
    Ok(Dataset::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{movie, NA};

    fn sample() -> Vec<MovieRecord> {
        let mut detailed = movie("霸王别姬 - Farewell My Concubine", "9.5", "剧情, 爱情");
        detailed.region = "中国内地、中国香港".into();
        detailed.duration = "171 分钟".into();
        detailed.release_date = "1993-07-26 上映".into();
        detailed.cover_url = "https://p0.meituan.net/movie/ce4da3e03e655b5b88ed31b5cd7896cf62472.jpg".into();
        detailed.detail_url = "https://ssr1.scrape.center/detail/1".into();

        let quoted = movie("He said \"hi\", twice", "暂无", NA);
        vec![detailed, quoted, movie(NA, NA, NA)]
    }

    #[test]
    fn round_trip() {
        let records = sample();
        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();
        assert_eq!(read_records(buf.as_slice()).unwrap(), records);
    }

    #[test]
    fn bom_and_header() {
        let mut buf = Vec::new();
        write_records(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(BOM));
        let header = text.trim_start_matches(BOM).lines().next().unwrap();
        assert_eq!(header, "title,categories,region,duration,releaseDate,score,coverUrl,detailUrl");
        assert!(text.contains("\"He said \"\"hi\"\", twice\""));
    }

    #[test]
    fn empty_view_still_has_header() {
        let mut buf = Vec::new();
        write_records(&mut buf, &Vec::<MovieRecord>::new()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim_start_matches(BOM).trim_end(), HEADERS.join(","));
        assert!(read_records(text.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn reads_without_bom() {
        let text = "title,categories,region,duration,releaseDate,score,coverUrl,detailUrl\nA,N/A,N/A,N/A,N/A,9.1,N/A,N/A\n";
        let records = read_records(text.as_bytes()).unwrap();
        assert_eq!(records[0].title, "A");
        assert_eq!(records[0].score, "9.1");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("movie.csv");
        save(&path, &sample()).unwrap();
        assert_eq!(load(&path).unwrap().records(), sample().as_slice());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("movie.csv")).unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }
}
