use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::Context;
use rayon::prelude::*;

use crate::{
    assets::{
        PreparedImage,
        catalog::AssetCatalog,
        decode::{load_image, unpremultiply_rgba8_in_place},
    },
    config::model::FileType,
    foundation::error::{ForgeError, ForgeResult},
    model::{Collection, TraitSet, TraitValue},
    output::layout::OutputLayout,
    render::composite::composite_layers,
};

/// Options for [`render_collection`].
#[derive(Clone, Debug, Default)]
pub struct RenderOpts {
    /// Worker threads; `None` uses one per available core.
    pub threads: Option<usize>,
    /// Stop starting new renders after the first failure.
    pub fail_fast: bool,
}

/// What happened to one trait set of a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Image written to the given path.
    Rendered(PathBuf),
    /// Rendering failed; nothing usable was written.
    Failed(String),
    /// Not attempted because the batch was cancelled.
    Skipped,
}

/// A failed trait set within a [`BatchReport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderFailure {
    /// Collection position of the trait set.
    pub index: usize,
    /// Error chain, rendered as text.
    pub reason: String,
}

/// Aggregate result of rendering a collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Images written.
    pub rendered: usize,
    /// Trait sets that failed, in collection order.
    pub failed: Vec<RenderFailure>,
    /// Trait sets never attempted.
    pub skipped: usize,
}

impl BatchReport {
    /// Summarize per-trait-set outcomes listed in collection order.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = RenderOutcome>) -> Self {
        let mut report = Self::default();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                RenderOutcome::Rendered(_) => report.rendered += 1,
                RenderOutcome::Failed(reason) => {
                    report.failed.push(RenderFailure { index, reason })
                }
                RenderOutcome::Skipped => report.skipped += 1,
            }
        }
        report
    }

    /// Whether every trait set was rendered.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0
    }

    /// Number of trait sets in the batch.
    pub fn total(&self) -> usize {
        self.rendered + self.failed.len() + self.skipped
    }
}

/// Asset files for `set`, bottom layer first. Absent layers contribute nothing.
pub fn resolve_sources<'c>(
    catalog: &'c AssetCatalog,
    layer_names: &[String],
    set: &TraitSet,
) -> ForgeResult<Vec<&'c Path>> {
    if set.len() != layer_names.len() {
        return Err(ForgeError::render(format!(
            "trait set has {} values for {} layers",
            set.len(),
            layer_names.len()
        )));
    }
    let mut sources = Vec::with_capacity(set.len());
    for (layer, value) in layer_names.iter().zip(set.values()) {
        if let TraitValue::Concrete(stem) = value {
            sources.push(catalog.resolve(layer, stem)?);
        }
    }
    Ok(sources)
}

/// Decode and stack the assets of `set` into a single premultiplied image.
pub fn render_trait_set(
    catalog: &AssetCatalog,
    layer_names: &[String],
    set: &TraitSet,
) -> ForgeResult<PreparedImage> {
    let images = resolve_sources(catalog, layer_names, set)?
        .into_iter()
        .map(load_image)
        .collect::<ForgeResult<Vec<_>>>()?;
    let refs: Vec<&PreparedImage> = images.iter().collect();
    composite_layers(&refs)
}

/// Encode `image` to `path`.
///
/// PNG keeps straight alpha; JPEG has no alpha channel, so the image is flattened onto black.
pub fn save_image(image: &PreparedImage, path: &Path, filetype: FileType) -> ForgeResult<()> {
    let (data, color) = match filetype {
        FileType::Png => {
            let mut rgba = image.rgba8_premul.clone();
            unpremultiply_rgba8_in_place(&mut rgba);
            (rgba, image::ColorType::Rgba8)
        }
        // Premultiplied color is already the color over black.
        FileType::Jpeg => {
            let rgb = image
                .rgba8_premul
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            (rgb, image::ColorType::Rgb8)
        }
    };

    image::save_buffer_with_format(
        path,
        &data,
        image.width,
        image.height,
        color,
        filetype.image_format(),
    )
    .with_context(|| format!("write {} '{}'", filetype.extension(), path.display()))?;
    Ok(())
}

/// Render every trait set of `collection` into `layout`'s images directory.
///
/// The images directory is emptied first. Trait sets render in parallel and fail independently:
/// a failure is recorded in the returned report and the batch carries on, unless
/// [`RenderOpts::fail_fast`] is set, in which case renders not yet started are skipped.
#[tracing::instrument(skip_all, fields(count = collection.len()))]
pub fn render_collection(
    collection: &Collection,
    catalog: &AssetCatalog,
    layout: &OutputLayout,
    filetype: FileType,
    opts: &RenderOpts,
) -> ForgeResult<BatchReport> {
    let pool = build_thread_pool(opts.threads)?;
    layout.recreate_images_dir()?;

    let cancelled = AtomicBool::new(false);
    let layer_names = collection.layer_names();

    let outcomes = pool.install(|| {
        collection
            .sets_slice()
            .par_iter()
            .enumerate()
            .map(|(index, set)| {
                if opts.fail_fast && cancelled.load(Ordering::Relaxed) {
                    return RenderOutcome::Skipped;
                }
                let path = layout.image_path(index, filetype);
                let result = render_trait_set(catalog, layer_names, set)
                    .and_then(|image| save_image(&image, &path, filetype));
                match result {
                    Ok(()) => {
                        tracing::trace!(index, path = %path.display(), "rendered");
                        RenderOutcome::Rendered(path)
                    }
                    Err(err) => {
                        let reason = format!("{err:#}");
                        tracing::warn!(index, error = %reason, "render failed");
                        if opts.fail_fast {
                            cancelled.store(true, Ordering::Relaxed);
                        }
                        RenderOutcome::Failed(reason)
                    }
                }
            })
            .collect::<Vec<_>>()
    });

    let report = BatchReport::from_outcomes(outcomes);
    tracing::info!(
        rendered = report.rendered,
        failed = report.failed.len(),
        skipped = report.skipped,
        dir = %layout.images_dir().display(),
        "render batch finished"
    );
    Ok(report)
}

fn build_thread_pool(threads: Option<usize>) -> ForgeResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ForgeError::validation("render 'threads' must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ForgeError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
