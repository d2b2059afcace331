//! External collaborators consumed by the recovery core through narrow
//! interfaces: mount-table inspection and read-only remounting, rotational
//! vs solid-state media detection, output path creation, and raw disk
//! geometry. None of this decodes XFS structures; it only talks to the host
//! OS on the core's behalf.

pub mod disk;
pub mod media;
pub mod mount;
pub mod pathutil;
pub mod util;
