//! Stage three: restoring entity metadata on recovered files.

use filetime::FileTime;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::analysis;
use crate::error::Result;
use crate::model::TargetEntity;
use crate::ops::OperationId;
use crate::tracking::RecoveryTracker;

/// Applies the captured permissions, ownership and timestamps to the
/// recovered entity. Idempotent; ownership is best-effort since it usually
/// requires elevated privileges.
pub fn apply(
    operation: OperationId,
    entity: &TargetEntity,
    track: &dyn RecoveryTracker,
) -> Result<()> {
    let target = entity.destination_path();
    let metadata = &entity.existing_metadata;

    apply_permissions(&target, metadata.permissions())?;
    apply_ownership(&target, metadata.owner(), metadata.group());

    let updated = FileTime::from_system_time(metadata.updated().into());
    filetime::set_file_times(&target, updated, updated)?;

    track.metadata_applied(operation, &entity.path);

    Ok(())
}

#[cfg(unix)]
fn apply_permissions(target: &Path, permissions: &str) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = analysis::parse_permissions(permissions)?;
    fs::set_permissions(target, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn apply_permissions(target: &Path, permissions: &str) -> Result<()> {
    let mode = analysis::parse_permissions(permissions)?;
    let mut current = fs::metadata(target)?.permissions();
    current.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(target, current)?;
    Ok(())
}

#[cfg(unix)]
fn apply_ownership(target: &Path, owner: &str, group: &str) {
    use nix::unistd::{chown, Gid, Group, Uid, User};

    let uid = User::from_name(owner)
        .ok()
        .flatten()
        .map(|user| user.uid)
        .or_else(|| owner.parse().ok().map(Uid::from_raw));

    let gid = Group::from_name(group)
        .ok()
        .flatten()
        .map(|group| group.gid)
        .or_else(|| group.parse().ok().map(Gid::from_raw));

    if let Err(e) = chown(target, uid, gid) {
        debug!(
            target = %target.display(),
            owner,
            group,
            error = %e,
            "Ownership not applied"
        );
    }
}

#[cfg(not(unix))]
fn apply_ownership(target: &Path, owner: &str, group: &str) {
    debug!(
        target = %target.display(),
        owner,
        group,
        "Ownership not supported on this platform"
    );
}
