mod ids;
mod playlist;
mod track;

pub use ids::{PlaylistId, SongId};
pub use playlist::PlaylistSource;
pub use track::{ResolutionRule, ResolvedPath, TrackReference};
