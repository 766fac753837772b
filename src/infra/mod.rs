//! Infrastructure utilities (hashing, compression, filesystem).

pub mod compression;
pub mod fs;
pub mod hash;

pub use compression::{compress, decompress};
pub use fs::{
    list_working_tree, read_file, relative_to_worktree, to_repo_path, walk_files, walk_worktree,
    write_file_atomic, FileStat, GIT_DIR_NAME,
};
pub use hash::{frame_header, hash_object, sha1};
