use crate::course::Course;
use crate::playground::CourseQuery;

/// Programmatic form of the command line; the binary maps clap arguments onto it.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert one course through the validated model.
    Create {
        course: Course,
    },
    /// One page of courses (`get_courses`).
    List {
        query: CourseQuery,
    },
    // Raw query subcommands
    Find {
        filter_json: String,
        sort: Option<String>,
        select: Option<String>,
        limit: Option<usize>,
        skip: Option<usize>,
    },
    Count {
        filter_json: String,
    },
    Update {
        id: String,
        set_json: String,
        /// Update-first (`$set` by id) instead of fetch-modify-save.
        direct: bool,
    },
    Remove {
        id: String,
    },
    /// Insert `count` generated courses.
    Seed {
        count: usize,
    },
    Compact,
    Info,
}
