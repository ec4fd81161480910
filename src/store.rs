use std::path::Path;

use parking_lot::Mutex;
use rocksdb::{Cache, DBWithThreadMode, MultiThreaded, Options, WriteBatch};
use tracing::{debug, warn};

use crate::{
    config::{StoreConfig, DEFAULT_ROW_CACHE_BYTES},
    error::{EventError, Result},
    event::{event_hash, parse_event_timestamp, StoreEventsRequest, ID_FIELD},
    key::{encode_event_key, encode_version_key},
    validation::ensure_tag,
};

pub(crate) type Db = DBWithThreadMode<MultiThreaded>;

/// A persistent, ordered collection of event rows and per-tag version rows.
///
/// Mutations serialize on a process-local guard; readers run against
/// rocksdb's snapshot-consistent iterators and never take it.
pub struct EventCollection {
    pub(crate) db: Db,
    write_lock: Mutex<()>,
}

impl EventCollection {
    /// Create the collection at `path`. Fails if backing storage already
    /// exists there.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(path, DEFAULT_ROW_CACHE_BYTES, true)
    }

    /// Open an existing collection at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(path, DEFAULT_ROW_CACHE_BYTES, false)
    }

    pub fn open_with<P: AsRef<Path>>(path: P, config: &StoreConfig) -> Result<Self> {
        Self::new(path, config.row_cache_bytes, false)
    }

    fn new<P: AsRef<Path>>(path: P, row_cache_bytes: usize, create: bool) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(create);
        options.set_error_if_exists(create);
        let cache = Cache::new_lru_cache(row_cache_bytes);
        options.set_row_cache(&cache);

        let db = Db::open(&options, path).map_err(|err| EventError::ReadFailed(err.to_string()))?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    /// Current version of `tag`: the number of batches successfully stored
    /// under it. `EventError::NotFound` if the tag has never been written.
    pub fn version(&self, tag: &str) -> Result<u64> {
        let value = self
            .db
            .get(encode_version_key(tag))
            .map_err(|err| EventError::ReadFailed(err.to_string()))?;
        let Some(value) = value else {
            return Err(EventError::NotFound);
        };
        let text = std::str::from_utf8(&value)
            .map_err(|_| EventError::ReadFailed("version row is not valid UTF-8".into()))?;
        text.parse()
            .map_err(|_| EventError::ReadFailed(format!("malformed version row {text:?}")))
    }

    /// Store a batch of events under the request's tag and bump the tag
    /// version, atomically. Returns the new version. Validation failures
    /// abort the whole batch before anything is written.
    pub fn store_events(&self, request: StoreEventsRequest) -> Result<u64> {
        if let Err(err) = ensure_tag(&request.tag) {
            warn!(tag = %request.tag, "rejected event batch");
            return Err(err);
        }

        let _guard = self.write_lock.lock();

        let mut batch = WriteBatch::default();
        for mut event in request.events {
            event.remove(ID_FIELD);
            let ts = parse_event_timestamp(&event)?;
            let hash = event_hash(&event).to_string();
            let value = serde_json::to_vec(&event)?;
            batch.put(encode_event_key(ts, &request.tag, &hash), value);
        }

        let version = match self.version(&request.tag) {
            Ok(version) => version,
            Err(EventError::NotFound) => 0,
            Err(_) => {
                return Err(EventError::ReadFailed(format!(
                    "version lookup failed for tag {}",
                    request.tag
                )));
            }
        };

        let version = version + 1;
        batch.put(encode_version_key(&request.tag), version.to_string());

        self.db
            .write(batch)
            .map_err(|err| EventError::WriteFailed(err.to_string()))?;

        debug!(tag = %request.tag, version, "stored event batch");
        Ok(version)
    }
}
