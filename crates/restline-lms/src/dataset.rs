//! Dataset tags and the pagination strategy each one uses

/// Datasets the engine knows how to extract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Users,
    Courses,
    Enrollments,
    Reports,
}

impl DatasetKind {
    pub const ALL: [Self; 4] = [Self::Users, Self::Courses, Self::Enrollments, Self::Reports];

    /// Parse CLI/config tag into enum
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::Users),
            "courses" => Some(Self::Courses),
            "enrollments" => Some(Self::Enrollments),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }

    /// Tag as used in config, logs and output file names
    pub fn api_name(self) -> &'static str {
        match self {
            Self::Users => "user",
            Self::Courses => "courses",
            Self::Enrollments => "enrollments",
            Self::Reports => "reports",
        }
    }

    /// Listing endpoint path below the API base. `None` for the report flow.
    pub fn endpoint_path(self) -> Option<&'static str> {
        match self {
            Self::Users => Some("/manage/v1/user"),
            Self::Courses => Some("/course/v1/courses"),
            Self::Enrollments => Some("/course/v1/courses/enrollments"),
            Self::Reports => None,
        }
    }

    /// Record field the internal-account exclusion looks at, if any
    pub fn exclusion_field(self) -> Option<&'static str> {
        match self {
            Self::Users | Self::Enrollments => Some("username"),
            Self::Courses | Self::Reports => None,
        }
    }

    pub fn output_format(self) -> OutputFormat {
        match self {
            Self::Reports => OutputFormat::Csv,
            _ => OutputFormat::JsonLines,
        }
    }

    /// Object name under the destination folder
    pub fn file_name(self) -> String {
        format!("{}.{}", self.api_name(), self.output_format().extension())
    }

    pub fn strategy(self, page_size: usize, export_page_size: usize) -> PaginationStrategy {
        match self {
            Self::Reports => PaginationStrategy::Token {
                page_size: export_page_size,
            },
            _ => PaginationStrategy::Offset { page_size },
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_name())
    }
}

/// How a dataset is paged through
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginationStrategy {
    /// `page`/`page_size` arithmetic, fetched concurrently in batches
    Offset { page_size: usize },
    /// Server-issued continuation tokens, fetched sequentially
    Token { page_size: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    JsonLines,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::JsonLines => "json",
            Self::Csv => "csv",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_valid() {
        assert_eq!(DatasetKind::from_name("user"), Some(DatasetKind::Users));
        assert_eq!(DatasetKind::from_name("courses"), Some(DatasetKind::Courses));
        assert_eq!(
            DatasetKind::from_name("enrollments"),
            Some(DatasetKind::Enrollments)
        );
        assert_eq!(DatasetKind::from_name("reports"), Some(DatasetKind::Reports));
    }

    #[test]
    fn from_name_invalid() {
        assert_eq!(DatasetKind::from_name("users"), None);
        assert_eq!(DatasetKind::from_name("User"), None);
        assert_eq!(DatasetKind::from_name(""), None);
    }

    #[test]
    fn api_name_roundtrip() {
        for kind in DatasetKind::ALL {
            assert_eq!(DatasetKind::from_name(kind.api_name()), Some(kind));
        }
    }

    #[test]
    fn only_reports_use_tokens() {
        for kind in DatasetKind::ALL {
            let s = kind.strategy(200, 1000);
            match kind {
                DatasetKind::Reports => {
                    assert_eq!(s, PaginationStrategy::Token { page_size: 1000 });
                    assert!(kind.endpoint_path().is_none());
                }
                _ => {
                    assert_eq!(s, PaginationStrategy::Offset { page_size: 200 });
                    assert!(kind.endpoint_path().is_some());
                }
            }
        }
    }

    #[test]
    fn file_names() {
        assert_eq!(DatasetKind::Users.file_name(), "user.json");
        assert_eq!(DatasetKind::Enrollments.file_name(), "enrollments.json");
        assert_eq!(DatasetKind::Reports.file_name(), "reports.csv");
    }

    #[test]
    fn exclusion_field_only_for_people_datasets() {
        assert_eq!(DatasetKind::Users.exclusion_field(), Some("username"));
        assert_eq!(DatasetKind::Enrollments.exclusion_field(), Some("username"));
        assert_eq!(DatasetKind::Courses.exclusion_field(), None);
        assert_eq!(DatasetKind::Reports.exclusion_field(), None);
    }
}
