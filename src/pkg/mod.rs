pub mod archive;
pub mod exec;
pub mod list;
pub mod select;

pub use archive::{
    add_files, archive_base_name, archive_entry_name, package, AddReport, ArchiveSink, NullSink,
    PackageOutcome, TarGzSink,
};
pub use exec::{confirm_overwrite, exec_list, exec_package};
pub use list::{print_listing, write_listing, write_listing_json};
pub use select::{filter_names, select_files, Patterns};
