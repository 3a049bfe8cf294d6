//! Rasterization Capability
//!
//! The compositor only decides *what* gets stacked. Pixels are the
//! processor's job, injected so hosts and tests can substitute their own.

use std::path::{Path, PathBuf};

use image::{imageops, ImageFormat, RgbaImage};
use thiserror::Error;

use crate::contribution::AssetRef;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Failed to read layer {}: {source}", path.display())]
    ReadLayer {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write composite {}: {source}", path.display())]
    WriteComposite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{0}")]
    Other(String),
}

/// One composite to produce. Assets are already in paint order.
#[derive(Debug, Clone, Copy)]
pub struct LayeredImageRequest<'a> {
    pub width: u32,
    pub height: u32,
    pub output_path: &'a Path,
    pub assets: &'a [AssetRef],
}

pub trait ImageProcessor: Send + Sync {
    fn create_image_with_layers(&self, request: &LayeredImageRequest<'_>) -> Result<(), ProcessorError>;
}

/// Default processor: alpha-over on a transparent RGBA canvas, saved as PNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterImageProcessor;

impl ImageProcessor for RasterImageProcessor {
    fn create_image_with_layers(&self, request: &LayeredImageRequest<'_>) -> Result<(), ProcessorError> {
        let mut canvas = RgbaImage::new(request.width, request.height);

        for asset in request.assets {
            let path = PathBuf::from(&asset.path);
            let layer = image::open(&path)
                .map_err(|source| ProcessorError::ReadLayer { path, source })?
                .to_rgba8();

            imageops::overlay(
                &mut canvas,
                &layer,
                i64::from(asset.x_offset),
                i64::from(asset.y_offset),
            );
        }

        canvas
            .save_with_format(request.output_path, ImageFormat::Png)
            .map_err(|source| ProcessorError::WriteComposite {
                path: request.output_path.to_path_buf(),
                source,
            })
    }
}
