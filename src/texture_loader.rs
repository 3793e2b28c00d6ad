use std::path::Path;

use crate::error::ViewerError;

/// Load and decode a PNG diffuse texture to raw RGBA8.
pub fn load_texture_rgba(path: &Path) -> Result<(Vec<u8>, u32, u32), ViewerError> {
    let img = image::open(path).map_err(|e| {
        ViewerError::new("texture-load")
            .with_arg("path", path.display())
            .push_std(e)
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    Ok((rgba.into_raw(), width, height))
}
