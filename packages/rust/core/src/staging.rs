//! Filesystem steps around a tool run: stage templates, clear the old
//! artifact, and clean up after success.

use tracing::debug;

use inputbuilder_shared::{BuildScriptPair, ExampleDirectory, InputBuilderError, Result};

/// Copy both template scripts into `example`, overwriting existing copies.
pub fn stage_scripts(pair: &BuildScriptPair, example: &ExampleDirectory) -> Result<()> {
    for (src, dst) in [
        (&pair.build_script, example.build_script_path()),
        (&pair.optional_script, example.optional_script_path()),
    ] {
        std::fs::copy(src, &dst).map_err(|e| {
            // A readable template means the destination side failed.
            let path = if src.is_file() { dst.clone() } else { src.clone() };
            InputBuilderError::io(path, e)
        })?;
        debug!(src = %src.display(), dst = %dst.display(), "staged script");
    }
    Ok(())
}

/// Delete a leftover artifact. Returns `true` if one was removed.
pub fn remove_stale_artifact(example: &ExampleDirectory) -> Result<bool> {
    let artifact = example.artifact_path();
    match std::fs::remove_file(&artifact) {
        Ok(()) => {
            debug!(artifact = %artifact.display(), "removed stale artifact");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(InputBuilderError::io(&artifact, e)),
    }
}

/// Remove both staged scripts after a successful build.
pub fn remove_staged_scripts(example: &ExampleDirectory) -> Result<()> {
    for path in [example.build_script_path(), example.optional_script_path()] {
        std::fs::remove_file(&path).map_err(|e| InputBuilderError::io(&path, e))?;
    }
    Ok(())
}
