//! Delimited serialization of artifacts and their persistence in the output directory.

use std::{
    ffi::OsStr,
    fs,
    path::{Component, Path, PathBuf},
};

use crate::{errors::Error, extract::Artifact, Result};

/// Outcome of writing a batch of artifacts.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Paths written, in artifact order.
    pub written: Vec<PathBuf>,
    /// Artifacts that could not be written (the batch continued past them).
    pub failed: Vec<Error>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Render an artifact as delimited UTF-8 text: header first, `\n` line endings, fields quoted
/// only when they contain the delimiter, a quote, or a line break.
pub fn serialize(artifact: &Artifact) -> std::result::Result<Vec<u8>, csv::Error> {
    let mut w = csv::WriterBuilder::new()
        .delimiter(artifact.delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    w.write_record(&artifact.header)?;
    for row in &artifact.rows {
        w.write_record(row)?;
    }

    w.into_inner().map_err(|e| e.into_error().into())
}

/// Write one artifact to `dir/<file_name>`, replacing any previous file of that name.
pub fn write_artifact(dir: &Path, artifact: &Artifact) -> Result<PathBuf> {
    let path = dir.join(&artifact.file_name);
    let write_err = |reason: String| Error::Write {
        path: path.clone(),
        reason,
    };

    // Group values end up in names verbatim; one with a separator cannot be written as-is.
    if !is_single_component(&artifact.file_name) {
        return Err(write_err(format!(
            "artifact name {:?} is not a single file name",
            artifact.file_name
        )));
    }

    let bytes = serialize(artifact).map_err(|e| write_err(e.to_string()))?;
    fs::create_dir_all(dir).map_err(|e| write_err(e.to_string()))?;
    fs::write(&path, bytes).map_err(|e| write_err(e.to_string()))?;

    tracing::info!(path = %path.display(), rows = artifact.rows.len(), "artifact written");
    Ok(path)
}

fn is_single_component(name: &str) -> bool {
    let mut parts = Path::new(name).components();
    matches!(
        (parts.next(), parts.next()),
        (Some(Component::Normal(part)), None) if part == OsStr::new(name)
    )
}

/// Write every artifact; one failure never stops the others.
pub fn write_all(dir: &Path, artifacts: &[Artifact]) -> WriteReport {
    let mut report = WriteReport::default();
    for artifact in artifacts {
        match write_artifact(dir, artifact) {
            Ok(path) => report.written.push(path),
            Err(e) => {
                tracing::warn!(file = %artifact.file_name, error = %e, "artifact write failed");
                report.failed.push(e);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str, delimiter: u8, rows: Vec<Vec<&str>>) -> Artifact {
        Artifact {
            file_name: name.to_string(),
            header: vec!["username".into(), "currency".into(), "bet_amount".into()],
            delimiter,
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }

    #[test]
    fn serializes_with_custom_delimiter() {
        let a = artifact("a.csv", b';', vec![vec!["1", "EUR", "5"], vec!["2", "", "0"]]);
        let text = String::from_utf8(serialize(&a).unwrap()).unwrap();
        assert_eq!(text, "username;currency;bet_amount\n1;EUR;5\n2;;0\n");
    }

    #[test]
    fn quotes_only_when_needed() {
        let a = artifact("a.csv", b',', vec![vec!["a,b", "say \"hi\"", "1.5"]]);
        let text = String::from_utf8(serialize(&a).unwrap()).unwrap();
        assert_eq!(
            text,
            "username,currency,bet_amount\n\"a,b\",\"say \"\"hi\"\"\",1.5\n"
        );
    }

    #[test]
    fn header_only_when_no_rows() {
        let a = Artifact::user_ids("ids.csv".to_string(), []);
        assert_eq!(serialize(&a).unwrap(), b"user_id\n");
    }

    #[test]
    fn writes_and_overwrites_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let a = artifact("x_crm.csv", b',', vec![vec!["1", "EUR", "5"]]);

        let p1 = write_artifact(&out, &a).unwrap();
        let first = fs::read(&p1).unwrap();
        let p2 = write_artifact(&out, &a).unwrap();
        assert_eq!(p1, p2);
        assert_eq!(p1, out.join("x_crm.csv"));
        assert_eq!(fs::read(&p2).unwrap(), first);
    }

    #[test]
    fn group_values_with_separators_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["070425_Linear_Retention_2_Casino_VIP/High_crm.csv", "..", "a/"] {
            let err = write_artifact(dir.path(), &artifact(name, b',', vec![])).unwrap_err();
            assert!(
                matches!(&err, Error::Write { reason, .. } if reason.contains("single file name")),
                "{name}: {err}"
            );
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(is_single_component("070425_Linear_Retention_2_Casino_VIP High_crm.csv"));
    }

    #[test]
    fn failed_artifact_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the target name makes that single write fail.
        fs::create_dir_all(dir.path().join("blocked.csv")).unwrap();

        let batch = vec![
            artifact("first.csv", b',', vec![]),
            artifact("blocked.csv", b',', vec![]),
            artifact("last.csv", b',', vec![]),
        ];
        let report = write_all(dir.path(), &batch);
        assert!(!report.is_complete());
        assert_eq!(
            report.written,
            vec![dir.path().join("first.csv"), dir.path().join("last.csv")]
        );
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(&report.failed[0], Error::Write { path, .. } if path.ends_with("blocked.csv")));
    }
}
