use std::path::{Component, Path, PathBuf};
use tracing::{error, info, warn};

use crate::core::error::FilesystemError;
use crate::models::transfer::{TorrentFileDescriptor, TransferInfo};

/// Extensions treated as video, compared case-insensitively
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Exactly one video: flattened into the movies root
    Movie,
    /// Several videos: kept under `<tv root>/<torrent name>/`
    TvShow,
    /// No videos, nothing to move
    Nothing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug)]
pub struct OrganizeReport {
    pub placement: Placement,
    pub moved: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: usize,
}

pub fn is_video_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

pub fn classify(files: &[&TorrentFileDescriptor]) -> Placement {
    match files.len() {
        0 => Placement::Nothing,
        1 => Placement::Movie,
        _ => Placement::TvShow,
    }
}

/// Only plain relative components; anything that could climb out of the destination is refused
fn is_contained(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Sorts finished downloads into the movies and TV show trees
pub struct ContentOrganizer {
    movies_root: PathBuf,
    tv_shows_root: PathBuf,
}

impl ContentOrganizer {
    pub fn new(movies_root: PathBuf, tv_shows_root: PathBuf) -> Self {
        Self {
            movies_root,
            tv_shows_root,
        }
    }

    pub fn movies_root(&self) -> &Path {
        &self.movies_root
    }

    pub fn tv_shows_root(&self) -> &Path {
        &self.tv_shows_root
    }

    /// Work out where each video of a transfer goes, without touching the disk.
    ///
    /// Entries whose names would escape the destination are left out.
    pub fn plan(&self, transfer: &TransferInfo) -> (Placement, Vec<PlannedMove>) {
        let videos: Vec<&TorrentFileDescriptor> = transfer
            .files
            .iter()
            .filter(|file| is_video_file(&file.name))
            .collect();

        let placement = classify(&videos);
        let moves = match placement {
            Placement::Nothing => Vec::new(),
            Placement::Movie => videos
                .iter()
                .filter(|file| {
                    let contained = is_contained(Path::new(&file.name));
                    if !contained {
                        warn!(name = %file.name, "Refusing to place file outside the movies root");
                    }
                    contained
                })
                .map(|file| PlannedMove {
                    from: file.location.clone(),
                    to: self.movies_root.join(&file.name),
                })
                .collect(),
            Placement::TvShow => {
                if !is_contained(Path::new(&transfer.name)) {
                    warn!(torrent = %transfer.name, "Refusing to organize torrent with unsafe name");
                    return (placement, Vec::new());
                }

                let show_root = self.tv_shows_root.join(&transfer.name);
                videos
                    .iter()
                    .filter(|file| {
                        let contained = is_contained(&file.relative_path);
                        if !contained {
                            warn!(
                                path = %file.relative_path.display(),
                                "Refusing to place file outside the show folder"
                            );
                        }
                        contained
                    })
                    .map(|file| PlannedMove {
                        from: file.location.clone(),
                        to: show_root.join(&file.relative_path),
                    })
                    .collect()
            }
        };

        (placement, moves)
    }

    /// Create both destination roots
    pub async fn ensure_roots(&self) -> Result<(), FilesystemError> {
        for root in [&self.movies_root, &self.tv_shows_root] {
            tokio::fs::create_dir_all(root)
                .await
                .map_err(|source| FilesystemError::CreateDir {
                    path: root.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Move a finished transfer's videos into place.
    ///
    /// Each file is handled on its own: a missing source is skipped and a
    /// failed move is counted, and neither stops the rest of the batch.
    pub async fn organize(&self, transfer: &TransferInfo) -> Result<OrganizeReport, FilesystemError> {
        self.ensure_roots().await?;

        let (placement, moves) = self.plan(transfer);
        let mut report = OrganizeReport {
            placement,
            moved: Vec::new(),
            skipped: Vec::new(),
            failed: 0,
        };

        if placement == Placement::Nothing {
            warn!(
                torrent = %transfer.name,
                files = transfer.files.len(),
                "No video files in finished torrent, nothing to organize"
            );
            return Ok(report);
        }

        for planned in moves {
            match tokio::fs::try_exists(&planned.from).await {
                Ok(true) => {}
                Ok(false) | Err(_) => {
                    warn!(path = %planned.from.display(), "File not found, skipping");
                    report.skipped.push(planned.from);
                    continue;
                }
            }

            match move_file(&planned.from, &planned.to).await {
                Ok(()) => {
                    info!(
                        from = %planned.from.display(),
                        to = %planned.to.display(),
                        placement = ?placement,
                        "Moved file"
                    );
                    report.moved.push(planned.to);
                }
                Err(e) => {
                    error!(error = %e, "Failed to move file");
                    report.failed += 1;
                }
            }
        }

        info!(
            torrent = %transfer.name,
            placement = ?report.placement,
            moved = report.moved.len(),
            skipped = report.skipped.len(),
            failed = report.failed,
            "Finished organizing torrent"
        );

        Ok(report)
    }
}

/// Rename into place, falling back to copy and delete when rename is impossible
/// (for example across filesystems).
async fn move_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| FilesystemError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let rename_err = match tokio::fs::rename(from, to).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    warn!(
        from = %from.display(),
        error = %rename_err,
        "Rename failed, falling back to copy"
    );

    let to_move_error = |source| FilesystemError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    tokio::fs::copy(from, to).await.map_err(to_move_error)?;
    tokio::fs::remove_file(from).await.map_err(to_move_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transfer::InfoHash;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        downloads: PathBuf,
        organizer: ContentOrganizer,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let downloads = dir.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        let organizer = ContentOrganizer::new(dir.path().join("movies"), dir.path().join("tv"));

        Fixture {
            _dir: dir,
            downloads,
            organizer,
        }
    }

    /// Write a file under `<downloads>/<torrent>/<relative>` and describe it
    fn file_on_disk(downloads: &Path, torrent: &str, relative: &str) -> TorrentFileDescriptor {
        let location = downloads.join(torrent).join(relative);
        std::fs::create_dir_all(location.parent().unwrap()).unwrap();
        std::fs::write(&location, relative.as_bytes()).unwrap();
        descriptor(downloads, torrent, relative)
    }

    fn descriptor(downloads: &Path, torrent: &str, relative: &str) -> TorrentFileDescriptor {
        let relative_path = PathBuf::from(relative);
        TorrentFileDescriptor {
            name: relative_path.file_name().unwrap().to_string_lossy().into_owned(),
            location: downloads.join(torrent).join(relative),
            relative_path,
        }
    }

    fn transfer(name: &str, files: Vec<TorrentFileDescriptor>) -> TransferInfo {
        TransferInfo {
            info_hash: InfoHash::parse("0101010101010101010101010101010101010101").unwrap(),
            name: name.to_string(),
            files,
            finished: true,
        }
    }

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file("movie.mkv"));
        assert!(is_video_file("MOVIE.MKV"));
        assert!(is_video_file("clip.Mp4"));
        assert!(is_video_file("old.avi"));
        assert!(!is_video_file("sample.txt"));
        assert!(!is_video_file("cover.jpg"));
        assert!(!is_video_file("mkv"));
        assert!(!is_video_file("movie.mkv.part"));
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained(Path::new("Season1/S01E01.mkv")));
        assert!(!is_contained(Path::new("../escape.mkv")));
        assert!(!is_contained(Path::new("/etc/passwd")));
        assert!(!is_contained(Path::new("")));
    }

    #[tokio::test]
    async fn test_single_video_goes_to_movies_root() {
        let f = fixture();
        let files = vec![
            file_on_disk(&f.downloads, "Movie.2020", "sub/movie.mkv"),
            file_on_disk(&f.downloads, "Movie.2020", "readme.txt"),
        ];

        let report = f.organizer.organize(&transfer("Movie.2020", files)).await.unwrap();

        assert_eq!(report.placement, Placement::Movie);
        let dest = f.organizer.movies_root().join("movie.mkv");
        assert!(dest.exists());
        assert_eq!(report.moved, vec![dest]);
        assert!(!f.downloads.join("Movie.2020/sub/movie.mkv").exists());
        // Non-video files stay behind
        assert!(f.downloads.join("Movie.2020/readme.txt").exists());
    }

    #[tokio::test]
    async fn test_multiple_videos_keep_structure_under_show() {
        let f = fixture();
        let files = vec![
            file_on_disk(&f.downloads, "ShowX", "Season1/S01E01.mkv"),
            file_on_disk(&f.downloads, "ShowX", "Season1/S01E02.mkv"),
        ];

        let report = f.organizer.organize(&transfer("ShowX", files)).await.unwrap();

        assert_eq!(report.placement, Placement::TvShow);
        assert_eq!(report.moved.len(), 2);

        let show = f.organizer.tv_shows_root().join("ShowX/Season1");
        assert_eq!(std::fs::read(show.join("S01E01.mkv")).unwrap(), b"Season1/S01E01.mkv");
        assert_eq!(std::fs::read(show.join("S01E02.mkv")).unwrap(), b"Season1/S01E02.mkv");
        assert!(!f.downloads.join("ShowX/Season1/S01E01.mkv").exists());
    }

    #[tokio::test]
    async fn test_no_videos_moves_nothing() {
        let f = fixture();
        let files = vec![
            file_on_disk(&f.downloads, "Album", "track01.flac"),
            file_on_disk(&f.downloads, "Album", "cover.jpg"),
        ];

        let report = f.organizer.organize(&transfer("Album", files)).await.unwrap();

        assert_eq!(report.placement, Placement::Nothing);
        assert!(report.moved.is_empty());
        assert!(report.skipped.is_empty());
        assert!(f.downloads.join("Album/track01.flac").exists());
        // Roots are still created
        assert!(f.organizer.movies_root().is_dir());
        assert!(f.organizer.tv_shows_root().is_dir());
    }

    #[tokio::test]
    async fn test_missing_source_skipped_rest_processed() {
        let f = fixture();
        let files = vec![
            descriptor(&f.downloads, "ShowY", "E01.mkv"),
            file_on_disk(&f.downloads, "ShowY", "E02.mkv"),
            file_on_disk(&f.downloads, "ShowY", "E03.mkv"),
        ];

        let report = f.organizer.organize(&transfer("ShowY", files)).await.unwrap();

        assert_eq!(report.skipped, vec![f.downloads.join("ShowY/E01.mkv")]);
        assert_eq!(report.moved.len(), 2);
        assert_eq!(report.failed, 0);
        assert!(f.organizer.tv_shows_root().join("ShowY/E03.mkv").exists());
    }

    #[tokio::test]
    async fn test_missing_single_movie_is_skipped() {
        let f = fixture();
        let files = vec![descriptor(&f.downloads, "Gone", "gone.mp4")];

        let report = f.organizer.organize(&transfer("Gone", files)).await.unwrap();

        assert_eq!(report.placement, Placement::Movie);
        assert!(report.moved.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_plan_drops_escaping_paths() {
        let f = fixture();
        let files = vec![
            descriptor(&f.downloads, "ShowZ", "E01.mkv"),
            descriptor(&f.downloads, "ShowZ", "../../E02.mkv"),
        ];

        let (placement, moves) = f.organizer.plan(&transfer("ShowZ", files));

        assert_eq!(placement, Placement::TvShow);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].to, f.organizer.tv_shows_root().join("ShowZ/E01.mkv"));
    }

    #[test]
    fn test_plan_refuses_unsafe_movie_name() {
        let f = fixture();
        let mut movie = descriptor(&f.downloads, "Movie", "movie.mkv");
        movie.name = "/etc/movie.mkv".to_string();

        let (placement, moves) = f.organizer.plan(&transfer("Movie", vec![movie]));

        assert_eq!(placement, Placement::Movie);
        assert!(moves.is_empty());
    }

    #[test]
    fn test_plan_refuses_unsafe_torrent_name() {
        let f = fixture();
        let files = vec![
            descriptor(&f.downloads, "x", "E01.mkv"),
            descriptor(&f.downloads, "x", "E02.mkv"),
        ];

        let (_, moves) = f.organizer.plan(&transfer("..", files));
        assert!(moves.is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_root_is_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let organizer = ContentOrganizer::new(blocker.join("movies"), dir.path().join("tv"));
        let result = organizer.organize(&transfer("x", Vec::new())).await;

        assert!(matches!(result, Err(FilesystemError::CreateDir { .. })));
    }
}
