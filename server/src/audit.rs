use cardroom_protocol::ActionRecord;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;

/// Append-only per-hand action log on disk, one JSON line per betting
/// action. The engine never reads these back; they exist for audit and
/// postmortem.
pub struct ActionLog {
    data_dir: PathBuf,
}

impl ActionLog {
    pub fn new(data_dir: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(data_dir.as_ref())?;
        Ok(ActionLog { data_dir: data_dir.as_ref().to_path_buf() })
    }

    fn file_path(&self, room: &str, hand_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}__{}.jsonl", room, hand_id))
    }

    pub async fn append(
        &self,
        room: &str,
        hand_id: &str,
        record: &ActionRecord,
    ) -> io::Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut file = async_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path(room, hand_id))
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        Ok(())
    }

    pub async fn read_all(&self, room: &str, hand_id: &str) -> io::Result<Vec<ActionRecord>> {
        let path = self.file_path(room, hand_id);
        if !path.exists() {
            return Ok(vec![]);
        }
        let content = async_fs::read_to_string(&path).await?;
        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ActionRecord>(line) {
                Ok(rec) => records.push(rec),
                Err(_) => continue, // tolerate a torn tail line
            }
        }
        Ok(records)
    }
}
