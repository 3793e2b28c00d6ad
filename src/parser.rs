// Asset loading and construction-time validation. Everything that can go
// wrong with an asset goes wrong here, before the animation core exists.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::animation::{Clip, ClipSet, Skeleton};
use crate::error::ViewerError;
use crate::model::{CharacterDoc, ClipData, HatsDoc, MeshData};

pub fn load_character(path: &Path) -> Result<CharacterDoc, ViewerError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ViewerError::new("character-read")
            .with_arg("path", path.display())
            .push_std(e)
    })?;
    let doc: CharacterDoc = serde_json::from_str(&text).map_err(|e| {
        ViewerError::new("character-parse")
            .with_arg("path", path.display())
            .push_std(e)
    })?;

    let mesh = &doc.mesh;
    if mesh.positions.len() != mesh.normals.len()
        || (mesh.is_skinned()
            && (mesh.joints.len() != mesh.positions.len()
                || mesh.weights.len() != mesh.positions.len()))
    {
        return Err(ViewerError::new("character-mesh-arrays")
            .with_arg("path", path.display())
            .with_arg("positions", mesh.positions.len()));
    }

    Ok(doc)
}

pub fn load_clip_data(path: &Path) -> Result<ClipData, ViewerError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ViewerError::new("clip-read")
            .with_arg("path", path.display())
            .push_std(e)
    })?;
    serde_json::from_str(&text).map_err(|e| {
        ViewerError::new("clip-parse")
            .with_arg("path", path.display())
            .push_std(e)
    })
}

pub fn load_mesh_data(path: &Path) -> Result<MeshData, ViewerError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ViewerError::new("mesh-read")
            .with_arg("path", path.display())
            .push_std(e)
    })?;
    let mesh: MeshData = serde_json::from_str(&text).map_err(|e| {
        ViewerError::new("mesh-parse")
            .with_arg("path", path.display())
            .push_std(e)
    })?;
    if mesh.positions.len() != mesh.normals.len() {
        return Err(ViewerError::new("mesh-arrays")
            .with_arg("path", path.display())
            .with_arg("positions", mesh.positions.len()));
    }
    Ok(mesh)
}

pub fn load_hats(path: &Path) -> Result<HatsDoc, ViewerError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ViewerError::new("hats-read")
            .with_arg("path", path.display())
            .push_std(e)
    })?;
    serde_json::from_str(&text).map_err(|e| {
        ViewerError::new("hats-parse")
            .with_arg("path", path.display())
            .push_std(e)
    })
}

/// Everything the app needs, loaded and compiled.
pub struct LoadedAssets {
    pub character: CharacterDoc,
    pub skeleton: Arc<Skeleton>,
    pub clips: ClipSet,
    pub hats: HatsDoc,
}

/// Load the character document and compile the runtime skeleton and clip set.
/// Clip paths are resolved relative to the character document; `hats.json`
/// next to it is optional.
pub fn load_assets(character_path: &Path) -> Result<LoadedAssets, ViewerError> {
    let character = load_character(character_path)?;
    let skeleton = Arc::new(Skeleton::from_data(&character.skeleton)?);

    let dir = character_path.parent().unwrap_or_else(|| Path::new("."));
    let compile = |rel: &str| -> Result<Arc<Clip>, ViewerError> {
        let data = load_clip_data(&dir.join(rel))?;
        Ok(Arc::new(Clip::compile(&data, &skeleton)?))
    };
    let clips = ClipSet {
        idle: compile(&character.clips.idle)?,
        walk: compile(&character.clips.walk)?,
        punch: compile(&character.clips.punch)?,
        kick: compile(&character.clips.kick)?,
    };

    let hats_path = dir.join("hats.json");
    let hats = if hats_path.exists() {
        load_hats(&hats_path)?
    } else {
        log::warn!("no hats.json next to {}", character_path.display());
        HatsDoc::default()
    };

    log::info!(
        "loaded character '{}': {} bones, clips idle {:.2}s / walk {:.2}s / punch {:.2}s / kick {:.2}s, {} hats",
        character.name,
        skeleton.bone_count(),
        clips.idle.duration,
        clips.walk.duration,
        clips.punch.duration,
        clips.kick.duration,
        hats.hats.len()
    );

    Ok(LoadedAssets {
        character,
        skeleton,
        clips,
        hats,
    })
}
