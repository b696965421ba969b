// Submodules for separation of concerns
mod builder;
mod cursor;
mod eval;
mod exec;
mod parse;
mod types;

// Public API re-exports
pub use builder::{Query, ReadHook};
pub use cursor::Cursor;
pub use eval::{compare_bson, compare_docs, eval_filter, project};
pub use exec::{apply_update, count_docs, delete_many, delete_one, find_docs};
pub use parse::{
    UpdateDocSerde, json_to_document, parse_filter, parse_filter_json, parse_projection,
    parse_projection_str, parse_sort, parse_sort_str, parse_update, parse_update_json,
};
pub use types::{
    CmpOp, DeleteReport, Filter, FindOptions, MAX_LIMIT, Order, Projection, SortSpec, UpdateDoc,
    UpdateReport,
};
