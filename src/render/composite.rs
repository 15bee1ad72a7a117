use crate::{
    assets::PreparedImage,
    foundation::{
        error::{ForgeError, ForgeResult},
        math::mul_div255,
    },
};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over for premultiplied pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255 - sa;

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(dst[3], inv));
    for i in 0..3 {
        let dc = mul_div255(dst[i], inv);
        out[i] = src[i].saturating_add(dc);
    }
    out
}

/// Source-over `src` onto `dst`, pixel by pixel.
pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> ForgeResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ForgeError::render("over_in_place expects equal-length rgba8 buffers"));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Stack `layers` bottom to top.
///
/// The first image is the base and fixes the canvas size. Later images are anchored at the
/// top-left corner; pixels outside the canvas are clipped and uncovered canvas is left as is.
pub fn composite_layers(layers: &[&PreparedImage]) -> ForgeResult<PreparedImage> {
    let Some((base, rest)) = layers.split_first() else {
        return Err(ForgeError::render("nothing to composite"));
    };

    let mut canvas = (*base).clone();
    for layer in rest {
        if (layer.width, layer.height) == (canvas.width, canvas.height) {
            over_in_place(&mut canvas.rgba8_premul, &layer.rgba8_premul)?;
        } else {
            tracing::trace!(
                layer_w = layer.width,
                layer_h = layer.height,
                canvas_w = canvas.width,
                canvas_h = canvas.height,
                "clipping layer to canvas"
            );
            over_clipped(&mut canvas, layer)?;
        }
    }
    Ok(canvas)
}

fn over_clipped(canvas: &mut PreparedImage, layer: &PreparedImage) -> ForgeResult<()> {
    let w = canvas.width.min(layer.width) as usize * 4;
    let h = canvas.height.min(layer.height) as usize;
    if w == 0 || h == 0 {
        return Ok(());
    }
    let dst_stride = canvas.width as usize * 4;
    let src_stride = layer.width as usize * 4;
    for (dst_row, src_row) in canvas
        .rgba8_premul
        .chunks_exact_mut(dst_stride)
        .zip(layer.rgba8_premul.chunks_exact(src_stride))
        .take(h)
    {
        over_in_place(&mut dst_row[..w], &src_row[..w])?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
