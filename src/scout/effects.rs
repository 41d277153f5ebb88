use log::info;

use crate::matches::MatchedPost;

/// Downstream actions dispatched when a candidate matches: visual highlight,
/// notification sound, reply-generation request. All fire-and-forget from the
/// scan loop's perspective; implementations must return quickly and spawn
/// their own work if it blocks.
pub trait MatchEffects: Send + Sync {
    fn highlight(&self, post: &MatchedPost);

    fn play_sound(&self);

    fn request_generation(&self, post: &MatchedPost);
}

/// Logs each effect instead of performing it. Default for headless runs.
pub struct LogEffects;

impl MatchEffects for LogEffects {
    fn highlight(&self, post: &MatchedPost) {
        info!("match {}: highlight requested", post.id);
    }

    fn play_sound(&self) {
        info!("match notification sound requested");
    }

    fn request_generation(&self, post: &MatchedPost) {
        info!("match {}: reply generation requested", post.id);
    }
}

/// Discards every effect.
pub struct NoopEffects;

impl MatchEffects for NoopEffects {
    fn highlight(&self, _post: &MatchedPost) {}

    fn play_sound(&self) {}

    fn request_generation(&self, _post: &MatchedPost) {}
}
