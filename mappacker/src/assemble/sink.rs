//! Single-writer channel in front of the MBTiles writer.
//!
//! SQLite work runs on one blocking thread that owns the [`MbtilesWriter`];
//! the async render loop hands it metadata and tiles in order.

use super::AssembleError;
use crate::coord::TileCoord;
use crate::store::{ArchiveStats, MbtilesWriter, StoreError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 64;

enum WriteCommand {
    Metadata(BTreeMap<String, String>),
    Tile(TileCoord, Vec<u8>),
}

/// Ordered writer for one container file.
pub struct ContainerSink {
    tx: mpsc::Sender<WriteCommand>,
    handle: Option<JoinHandle<Result<ArchiveStats, StoreError>>>,
}

impl ContainerSink {
    /// Creates the container at `path`, failing immediately if it cannot be opened.
    pub async fn create(path: PathBuf) -> Result<Self, AssembleError> {
        let writer = tokio::task::spawn_blocking(move || MbtilesWriter::create(path))
            .await
            .map_err(|e| AssembleError::Task(e.to_string()))??;

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::task::spawn_blocking(move || {
            let mut writer = writer;
            while let Some(command) = rx.blocking_recv() {
                match command {
                    WriteCommand::Metadata(entries) => writer.write_metadata(&entries)?,
                    WriteCommand::Tile(tile, data) => writer.put_tile(tile, &data)?,
                }
            }
            writer.finalize()
        });

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    pub async fn write_metadata(
        &mut self,
        entries: BTreeMap<String, String>,
    ) -> Result<(), AssembleError> {
        self.send(WriteCommand::Metadata(entries)).await
    }

    pub async fn put_tile(&mut self, tile: TileCoord, data: Vec<u8>) -> Result<(), AssembleError> {
        self.send(WriteCommand::Tile(tile, data)).await
    }

    /// Commits and closes the container, returning its tile count and size.
    pub async fn finish(self) -> Result<ArchiveStats, AssembleError> {
        let Self { tx, handle } = self;
        // closing the channel ends the writer loop
        drop(tx);
        Self::join(handle).await
    }

    async fn send(&mut self, command: WriteCommand) -> Result<(), AssembleError> {
        if self.tx.send(command).await.is_ok() {
            return Ok(());
        }
        // The writer thread stopped early; report why.
        match Self::join(self.handle.take()).await {
            Err(e) => Err(e),
            Ok(_) => Err(AssembleError::WriterClosed),
        }
    }

    async fn join(
        handle: Option<JoinHandle<Result<ArchiveStats, StoreError>>>,
    ) -> Result<ArchiveStats, AssembleError> {
        let handle = handle.ok_or(AssembleError::WriterClosed)?;
        let stats = handle
            .await
            .map_err(|e| AssembleError::Task(e.to_string()))??;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MbtilesReader;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sink_writes_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mbtiles");
        let mut sink = ContainerSink::create(path.clone()).await.unwrap();

        let mut meta = BTreeMap::new();
        meta.insert("name".to_string(), "test".to_string());
        sink.write_metadata(meta).await.unwrap();
        sink.put_tile(TileCoord::new(1, 0, 0), b"a".to_vec()).await.unwrap();
        sink.put_tile(TileCoord::new(1, 0, 0), b"b".to_vec()).await.unwrap();
        sink.put_tile(TileCoord::new(1, 1, 0), b"c".to_vec()).await.unwrap();

        let stats = sink.finish().await.unwrap();
        assert_eq!(stats.tile_count, 2);
        assert!(stats.size_bytes > 0);

        let reader = MbtilesReader::new(&path);
        assert_eq!(reader.tile(TileCoord::new(1, 0, 0)).unwrap(), Some(b"b".to_vec()));
        assert_eq!(reader.metadata().unwrap()["name"], "test");
    }

    #[tokio::test]
    async fn test_create_failure_is_immediate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("out.mbtiles");
        assert!(matches!(
            ContainerSink::create(path).await,
            Err(AssembleError::Storage(_))
        ));
    }
}
