use std::fmt;

use crate::PreconditionViolation;

pub const MAX_SEARCH_PAGES: u32 = 50;
pub const MAX_REVIEWS_LIMIT: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Search,
    Shop,
    Reviews,
    Analyze,
}

impl TaskKind {
    /// Human label used in the "task started" log line.
    pub fn label(self) -> &'static str {
        match self {
            TaskKind::Search => "Search",
            TaskKind::Shop => "Shop scraping",
            TaskKind::Reviews => "Review scraping",
            TaskKind::Analyze => "Analysis",
        }
    }

    /// Analysis runs on an uploaded file only; every other kind drives the remote browser.
    pub fn requires_driver(self) -> bool {
        !matches!(self, TaskKind::Analyze)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A CSV file picked by the operator, sent as a multipart part.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRequest {
    Search {
        keyword: String,
        pages: u32,
    },
    Shop {
        shop_id: String,
        include_active: bool,
        include_sold_out: bool,
    },
    Reviews {
        file: FileUpload,
        max_reviews: u32,
    },
    Analyze {
        file: FileUpload,
    },
}

impl TaskRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::Search { .. } => TaskKind::Search,
            TaskRequest::Shop { .. } => TaskKind::Shop,
            TaskRequest::Reviews { .. } => TaskKind::Reviews,
            TaskRequest::Analyze { .. } => TaskKind::Analyze,
        }
    }

    /// Checks the request's own field constraints.
    pub fn validate(&self) -> Result<(), PreconditionViolation> {
        match self {
            TaskRequest::Search { keyword, pages } => {
                if keyword.trim().is_empty() {
                    return Err(PreconditionViolation::EmptyKeyword);
                }
                if !(1..=MAX_SEARCH_PAGES).contains(pages) {
                    return Err(PreconditionViolation::PagesOutOfRange(*pages));
                }
            }
            TaskRequest::Shop {
                shop_id,
                include_active,
                include_sold_out,
            } => {
                if shop_id.trim().is_empty() {
                    return Err(PreconditionViolation::EmptyShopId);
                }
                if !include_active && !include_sold_out {
                    return Err(PreconditionViolation::NoItemStateSelected);
                }
            }
            TaskRequest::Reviews { file, max_reviews } => {
                validate_file(file)?;
                if !(1..=MAX_REVIEWS_LIMIT).contains(max_reviews) {
                    return Err(PreconditionViolation::MaxReviewsOutOfRange(*max_reviews));
                }
            }
            TaskRequest::Analyze { file } => validate_file(file)?,
        }
        Ok(())
    }
}

fn validate_file(file: &FileUpload) -> Result<(), PreconditionViolation> {
    if file.file_name.trim().is_empty() {
        return Err(PreconditionViolation::MissingFile);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv() -> FileUpload {
        FileUpload::new("items.csv", b"url\n".to_vec())
    }

    #[test]
    fn search_bounds() {
        let ok = TaskRequest::Search {
            keyword: "laptop".into(),
            pages: 50,
        };
        assert_eq!(ok.validate(), Ok(()));

        let zero = TaskRequest::Search {
            keyword: "laptop".into(),
            pages: 0,
        };
        assert_eq!(zero.validate(), Err(PreconditionViolation::PagesOutOfRange(0)));

        let blank = TaskRequest::Search {
            keyword: "   ".into(),
            pages: 5,
        };
        assert_eq!(blank.validate(), Err(PreconditionViolation::EmptyKeyword));
    }

    #[test]
    fn shop_needs_an_item_state() {
        let none = TaskRequest::Shop {
            shop_id: "123".into(),
            include_active: false,
            include_sold_out: false,
        };
        assert_eq!(none.validate(), Err(PreconditionViolation::NoItemStateSelected));

        let sold_out_only = TaskRequest::Shop {
            shop_id: "123".into(),
            include_active: false,
            include_sold_out: true,
        };
        assert_eq!(sold_out_only.validate(), Ok(()));
    }

    #[test]
    fn reviews_bounds_and_file() {
        let too_many = TaskRequest::Reviews {
            file: csv(),
            max_reviews: MAX_REVIEWS_LIMIT + 1,
        };
        assert_eq!(
            too_many.validate(),
            Err(PreconditionViolation::MaxReviewsOutOfRange(MAX_REVIEWS_LIMIT + 1))
        );

        let unnamed = TaskRequest::Analyze {
            file: FileUpload::new("", Vec::new()),
        };
        assert_eq!(unnamed.validate(), Err(PreconditionViolation::MissingFile));
    }

    #[test]
    fn only_analysis_skips_the_driver() {
        assert!(TaskKind::Search.requires_driver());
        assert!(TaskKind::Shop.requires_driver());
        assert!(TaskKind::Reviews.requires_driver());
        assert!(!TaskKind::Analyze.requires_driver());
    }

    #[test]
    fn debug_hides_file_bytes() {
        let rendered = format!("{:?}", csv());
        assert!(rendered.contains("items.csv"));
        assert!(!rendered.contains("bytes"));
    }
}
