use crossbeam_channel::{unbounded, Receiver, Sender};
use image::imageops::FilterType;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Cover extensions, in lookup order
const COVER_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// A decoded cover, ready to hand to the renderer
#[derive(Clone, PartialEq)]
pub struct Cover {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row major
    pub rgba: Vec<u8>,
}

impl fmt::Debug for Cover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cover")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Look for `<dir>/<cover_dir>/<name>.jpg`, then `.png`
pub fn find_cover(dir: &Path, cover_dir: &str, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let covers = dir.join(cover_dir);
    COVER_EXTENSIONS
        .iter()
        .map(|ext| covers.join(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
}

/// Decode an image and shrink it to fit within `max_width` x `max_height`,
/// keeping its aspect ratio. Images that already fit are left at their size.
pub fn decode_cover(path: &Path, max_width: u32, max_height: u32) -> image::ImageResult<Cover> {
    let img = image::open(path)?;

    let img = if img.width() > max_width || img.height() > max_height {
        img.resize(max_width.max(1), max_height.max(1), FilterType::Triangle)
    } else {
        img
    };

    let rgba = img.into_rgba8();
    Ok(Cover {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

struct Job {
    slot: usize,
    generation: u64,
    alive: Arc<AtomicBool>,
    path: PathBuf,
}

struct Completion {
    slot: usize,
    generation: u64,
    cover: Option<Cover>,
}

/// Liveness token for the one outstanding request a slot may own
struct Pending {
    generation: u64,
    alive: Arc<AtomicBool>,
}

/// Background cover decoding
///
/// Requests go out on a job queue to a small pool of worker threads and
/// come back on a completion queue. The owner drains completions with
/// `drain` from its own thread; nothing else touches its state.
///
/// A slot is a consumer-side position (a grid cell). Re-requesting or
/// discarding a slot invalidates its outstanding request: workers skip the
/// job if they have not started it, and `drain` drops the result if they have.
pub struct ThumbnailPipeline {
    jobs: Option<Sender<Job>>,
    results: Receiver<Completion>,
    workers: Vec<JoinHandle<()>>,
    pending: HashMap<usize, Pending>,
    next_generation: u64,
}

impl ThumbnailPipeline {
    /// Start `workers` decode threads producing covers that fit `cover_box`
    pub fn new(workers: usize, cover_box: (u32, u32)) -> Self {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded::<Completion>();
        let (max_width, max_height) = cover_box;

        let mut handles = Vec::new();
        for index in 0..workers.max(1) {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("thumbnail-{}", index))
                .spawn(move || {
                    for job in jobs.iter() {
                        if !job.alive.load(Ordering::Acquire) {
                            continue;
                        }
                        let cover = match decode_cover(&job.path, max_width, max_height) {
                            Ok(cover) => Some(cover),
                            Err(e) => {
                                debug!("no cover for {}: {}", job.path.display(), e);
                                None
                            }
                        };
                        if !job.alive.load(Ordering::Acquire) {
                            continue;
                        }
                        let done = Completion {
                            slot: job.slot,
                            generation: job.generation,
                            cover,
                        };
                        if results.send(done).is_err() {
                            break;
                        }
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("failed to start thumbnail worker {}: {}", index, e),
            }
        }
        info!("thumbnail pipeline started with {} workers", handles.len());

        Self {
            jobs: Some(job_tx),
            results: result_rx,
            workers: handles,
            pending: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Queue a decode for `slot`, superseding anything it had outstanding.
    /// Returns the generation of the new request.
    pub fn request(&mut self, slot: usize, path: PathBuf) -> u64 {
        self.discard(slot);

        self.next_generation += 1;
        let generation = self.next_generation;
        let alive = Arc::new(AtomicBool::new(true));

        let job = Job {
            slot,
            generation,
            alive: Arc::clone(&alive),
            path,
        };
        let sent = self.jobs.as_ref().is_some_and(|jobs| jobs.send(job).is_ok());
        if sent {
            self.pending.insert(slot, Pending { generation, alive });
        } else {
            warn!("thumbnail workers are gone, dropping request for slot {}", slot);
        }
        generation
    }

    /// Forget the outstanding request of `slot`, if any
    pub fn discard(&mut self, slot: usize) {
        if let Some(pending) = self.pending.remove(&slot) {
            pending.alive.store(false, Ordering::Release);
        }
    }

    /// Forget every outstanding request
    pub fn discard_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.alive.store(false, Ordering::Release);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, slot: usize) -> bool {
        self.pending.contains_key(&slot)
    }

    /// Collect finished decodes without blocking. `None` means the slot has
    /// no usable cover. Results for superseded requests are dropped here.
    pub fn drain(&mut self) -> Vec<(usize, Option<Cover>)> {
        let mut delivered = Vec::new();
        for done in self.results.try_iter() {
            let current = self
                .pending
                .get(&done.slot)
                .is_some_and(|p| p.generation == done.generation);
            if current {
                self.pending.remove(&done.slot);
                delivered.push((done.slot, done.cover));
            } else {
                debug!(
                    "dropping stale cover for slot {} (generation {})",
                    done.slot, done.generation
                );
            }
        }
        delivered
    }
}

impl Drop for ThumbnailPipeline {
    fn drop(&mut self) {
        self.discard_all();
        // Closing the queue ends the worker loops
        self.jobs.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        debug!("thumbnail pipeline stopped");
    }
}
