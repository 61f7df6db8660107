/// Media side of the catalog
///
/// This module handles:
/// - Locating cover images next to the videos
/// - Decoding covers on a background worker pool
/// - Launching the external player and file manager
pub mod player;
pub mod thumbnail;
