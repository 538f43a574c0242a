//! Asset loading context.
//!
//! Loading is abstracted behind [`AssetLoader`] so the core never touches the
//! network. One [`AssetContext`] is built at start-up and handed to whoever
//! needs to load models; it counts in-flight loads so the front-end knows
//! when everything requested so far has resolved.
//!
//! Each path is fetched and decoded once per context. Later requests for the
//! same path, including ones made while the first is still in flight, get a
//! copy of that first result.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use fnv::FnvHashMap;

use crate::animation::{find_clip, ClipInfo};
use crate::error::{Result, RingError};
use crate::scene::{Aabb, MeshData};
use crate::skeleton::Skeleton;

/// A decoded model: meshes in model space plus clip metadata. Skinned
/// meshes index into `skeleton`.
#[derive(Clone, Debug)]
pub struct ModelAsset {
    pub path: String,
    pub meshes: Vec<MeshData>,
    pub bounds: Aabb,
    pub clips: Vec<ClipInfo>,
    pub skeleton: Option<Arc<Skeleton>>,
}

impl ModelAsset {
    pub fn new(path: impl Into<String>, meshes: Vec<MeshData>, clips: Vec<ClipInfo>) -> Result<Self> {
        let path = path.into();
        if meshes.is_empty() {
            return Err(RingError::EmptyModel(path));
        }
        let bounds = meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, m| acc.union(&m.bounds));
        Ok(Self {
            path,
            meshes,
            bounds,
            clips,
            skeleton: None,
        })
    }

    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = Some(Arc::new(skeleton));
        self
    }

    pub fn find_clip(&self, name: &str) -> Result<&ClipInfo> {
        find_clip(&self.clips, name)
    }
}

pub type LoadFuture = Pin<Box<dyn Future<Output = Result<ModelAsset>>>>;

/// Resolves a model path into a decoded asset.
pub trait AssetLoader {
    fn load(&self, path: &str) -> LoadFuture;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub pending: u32,
    pub loaded: u32,
    pub failed: u32,
}

enum CacheSlot {
    Loading(Vec<Waker>),
    Ready(Result<ModelAsset>),
}

type AssetCache = Rc<RefCell<FnvHashMap<String, CacheSlot>>>;

/// Resolves once the first load of `path` has landed in the cache.
struct CachedLoad {
    cache: AssetCache,
    path: String,
}

impl Future for CachedLoad {
    type Output = Result<ModelAsset>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut cache = self.cache.borrow_mut();
        match cache.get_mut(&self.path) {
            Some(CacheSlot::Ready(result)) => Poll::Ready(result.clone()),
            Some(CacheSlot::Loading(wakers)) => {
                wakers.push(cx.waker().clone());
                Poll::Pending
            }
            None => Poll::Ready(Err(RingError::AssetLoad {
                path: self.path.clone(),
                reason: "load abandoned".into(),
            })),
        }
    }
}

#[derive(Clone)]
pub struct AssetContext {
    loader: Rc<dyn AssetLoader>,
    cache: AssetCache,
    pending: Rc<Cell<u32>>,
    loaded: Rc<Cell<u32>>,
    failed: Rc<Cell<u32>>,
}

impl AssetContext {
    pub fn new(loader: Rc<dyn AssetLoader>) -> Self {
        Self {
            loader,
            cache: Rc::new(RefCell::new(FnvHashMap::default())),
            pending: Rc::new(Cell::new(0)),
            loaded: Rc::new(Cell::new(0)),
            failed: Rc::new(Cell::new(0)),
        }
    }

    pub fn stats(&self) -> LoadStats {
        LoadStats {
            pending: self.pending.get(),
            loaded: self.loaded.get(),
            failed: self.failed.get(),
        }
    }

    /// Nothing in flight and at least one load has finished.
    pub fn all_settled(&self) -> bool {
        let s = self.stats();
        s.pending == 0 && s.loaded + s.failed > 0
    }

    /// Number of distinct paths requested so far.
    pub fn cached_paths(&self) -> usize {
        self.cache.borrow().len()
    }

    pub async fn load(&self, path: &str) -> Result<ModelAsset> {
        self.pending.set(self.pending.get() + 1);
        let first = {
            let mut cache = self.cache.borrow_mut();
            if cache.contains_key(path) {
                false
            } else {
                cache.insert(path.to_string(), CacheSlot::Loading(Vec::new()));
                true
            }
        };

        let result = if first {
            log::debug!("[assets] loading {path}");
            let result = self.loader.load(path).await;
            match &result {
                Ok(asset) => log::info!(
                    "[assets] loaded {path}: {} meshes, {} clips",
                    asset.meshes.len(),
                    asset.clips.len()
                ),
                Err(e) => log::error!("[assets] {e}"),
            }
            let previous = self
                .cache
                .borrow_mut()
                .insert(path.to_string(), CacheSlot::Ready(result.clone()));
            if let Some(CacheSlot::Loading(wakers)) = previous {
                wakers.into_iter().for_each(Waker::wake);
            }
            result
        } else {
            log::debug!("[assets] {path} already requested, sharing it");
            CachedLoad {
                cache: self.cache.clone(),
                path: path.to_string(),
            }
            .await
        };

        self.pending.set(self.pending.get().saturating_sub(1));
        match &result {
            Ok(_) => self.loaded.set(self.loaded.get() + 1),
            Err(_) => self.failed.set(self.failed.get() + 1),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Fixed {
        calls: Cell<u32>,
    }

    impl AssetLoader for Fixed {
        fn load(&self, path: &str) -> LoadFuture {
            self.calls.set(self.calls.get() + 1);
            let path = path.to_string();
            Box::pin(async move {
                if path == "missing.glb" {
                    return Err(RingError::AssetLoad {
                        path,
                        reason: "404".into(),
                    });
                }
                let mesh = MeshData::new(
                    vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]],
                    Vec::new(),
                    vec![0, 1, 2],
                );
                ModelAsset::new(path, vec![mesh], vec![ClipInfo::new("idle", 1.0)])
            })
        }
    }

    #[test]
    fn counts_loaded_and_failed() {
        let ctx = AssetContext::new(Rc::new(Fixed::default()));
        assert!(!ctx.all_settled());
        let ok = pollster::block_on(ctx.load("a.glb")).unwrap();
        assert_eq!(ok.bounds.size().y, 2.0);
        assert!(pollster::block_on(ctx.load("missing.glb")).is_err());
        assert_eq!(
            ctx.stats(),
            LoadStats {
                pending: 0,
                loaded: 1,
                failed: 1
            }
        );
        assert!(ctx.all_settled());
    }

    #[test]
    fn each_path_is_decoded_once() {
        let loader = Rc::new(Fixed::default());
        let ctx = AssetContext::new(loader.clone());
        for _ in 0..3 {
            let asset = pollster::block_on(ctx.load("a.glb")).unwrap();
            assert_eq!(asset.path, "a.glb");
        }
        assert!(pollster::block_on(ctx.load("missing.glb")).is_err());
        assert!(pollster::block_on(ctx.load("missing.glb")).is_err());
        assert_eq!(loader.calls.get(), 2);
        assert_eq!(ctx.cached_paths(), 2);
        // Every request still counts toward the settle stats.
        assert_eq!(ctx.stats().loaded, 3);
        assert_eq!(ctx.stats().failed, 2);
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(matches!(
            ModelAsset::new("x.glb", Vec::new(), Vec::new()),
            Err(RingError::EmptyModel(_))
        ));
    }
}
