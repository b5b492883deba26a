// Application state (AppState)

use crate::api::resolver::MetadataResolver;
use crate::api::search::SearchClient;
use crate::broadcast::progress::ProgressBroadcaster;
use crate::core::config::Config;
use crate::core::error::UpstreamError;
use crate::engine::{AddOptions, TorrentEngine};
use crate::organizer::content::ContentOrganizer;
use crate::stores::registry::DownloadRegistry;
use std::sync::Arc;

/// Shared application state
///
/// Built once per process and handed to every request handler and the
/// engine event pump.
#[derive(Clone)]
pub struct AppState {
    /// Active and completed downloads
    pub registry: Arc<DownloadRegistry>,

    /// Fan-out of progress snapshots to stats listeners
    pub broadcaster: Arc<ProgressBroadcaster>,

    pub organizer: Arc<ContentOrganizer>,

    /// Third-party torrent engine
    pub engine: Arc<dyn TorrentEngine>,

    pub search: Arc<SearchClient>,

    pub resolver: Arc<MetadataResolver>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn TorrentEngine>) -> Result<Self, UpstreamError> {
        let config = Arc::new(config);

        let search = Arc::new(SearchClient::new(&config.search)?);
        let resolver = Arc::new(MetadataResolver::new(&config.llm, &config.metadata)?);
        let organizer = Arc::new(ContentOrganizer::new(
            config.storage.movies_root.clone(),
            config.storage.tv_shows_root.clone(),
        ));

        Ok(Self {
            registry: Arc::new(DownloadRegistry::new()),
            broadcaster: Arc::new(ProgressBroadcaster::new(config.progress.channel_capacity)),
            organizer,
            engine,
            search,
            resolver,
            config,
        })
    }

    pub fn add_options(&self) -> AddOptions {
        AddOptions {
            download_dir: self.config.storage.downloads_dir.clone(),
        }
    }
}
