//! Query parameter parsing and typed course predicates.
//!
//! Every optional filter becomes one [`CoursePredicate`]; stores translate the
//! predicate list into parameterized queries (or evaluate it in memory), so no
//! caller-supplied text is ever spliced into SQL.

use log::debug;
use serde::Deserialize;
use uuid::Uuid;

use super::error::CatalogError;
use super::store::{CourseRow, LanguageRow};

/// Learner ids handed out to anonymous visitors by the web client.
pub const GUEST_LEARNER_PREFIX: &str = "guest-user-";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListCoursesParams {
    pub language: Option<String>,
    pub level: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LearnerParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilters {
    pub language_code: Option<String>,
    pub level: Option<i32>,
}

impl CourseFilters {
    pub fn parse(language: Option<&str>, level: Option<&str>) -> Result<Self, CatalogError> {
        let language_code = non_empty(language).map(str::to_string);
        let level = match non_empty(level) {
            Some(raw) => Some(raw.parse::<i32>().map_err(|_| {
                CatalogError::InvalidFilter(format!("level must be an integer, got '{raw}'"))
            })?),
            None => None,
        };
        Ok(Self {
            language_code,
            level,
        })
    }
}

impl ListCoursesParams {
    pub fn into_filters(self) -> Result<(CourseFilters, Option<Uuid>), CatalogError> {
        let filters = CourseFilters::parse(self.language.as_deref(), self.level.as_deref())?;
        let learner = parse_learner(self.user_id.as_deref())?;
        Ok((filters, learner))
    }
}

/// Resolves the optional `userId` parameter. Empty values and guest ids mean
/// "no learner"; anything else must be a UUID.
pub fn parse_learner(raw: Option<&str>) -> Result<Option<Uuid>, CatalogError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    if raw.starts_with(GUEST_LEARNER_PREFIX) {
        debug!("Treating guest learner {raw} as anonymous");
        return Ok(None);
    }
    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|_| CatalogError::InvalidFilter(format!("userId must be a UUID, got '{raw}'")))
}

/// Like [`parse_learner`], but the operation needs a registered learner.
pub fn require_learner(raw: Option<&str>) -> Result<Uuid, CatalogError> {
    parse_learner(raw)?.ok_or_else(|| {
        CatalogError::InvalidFilter("userId of a registered learner is required".to_string())
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoursePredicate {
    Active,
    CourseId(Uuid),
    LanguageCode(String),
    Level(i32),
}

impl CoursePredicate {
    pub fn matches(&self, course: &CourseRow, language: &LanguageRow) -> bool {
        match self {
            Self::Active => course.is_active,
            Self::CourseId(id) => course.id == *id,
            Self::LanguageCode(code) => language.code == *code,
            Self::Level(level) => course.level == *level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseQuery {
    predicates: Vec<CoursePredicate>,
}

impl CourseQuery {
    /// Starts from the set of courses a learner may see: active ones.
    pub fn eligible() -> Self {
        Self {
            predicates: vec![CoursePredicate::Active],
        }
    }

    pub fn from_filters(filters: &CourseFilters) -> Self {
        let mut query = Self::eligible();
        if let Some(code) = &filters.language_code {
            query = query.with(CoursePredicate::LanguageCode(code.clone()));
        }
        if let Some(level) = filters.level {
            query = query.with(CoursePredicate::Level(level));
        }
        query
    }

    pub fn with(mut self, predicate: CoursePredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[CoursePredicate] {
        &self.predicates
    }

    pub fn matches(&self, course: &CourseRow, language: &LanguageRow) -> bool {
        self.predicates.iter().all(|p| p.matches(course, language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_params_yield_no_filters() {
        let params = ListCoursesParams {
            language: Some(String::new()),
            level: Some(String::new()),
            user_id: Some(String::new()),
        };
        let (filters, learner) = params.into_filters().unwrap();
        assert_eq!(filters, CourseFilters::default());
        assert_eq!(learner, None);
    }

    #[test]
    fn test_non_numeric_level_is_invalid_filter() {
        let err = CourseFilters::parse(None, Some("abc")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidFilter(_)));

        let err = CourseFilters::parse(None, Some("2.5")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidFilter(_)));
    }

    #[test]
    fn test_level_and_language_are_kept_verbatim() {
        let filters = CourseFilters::parse(Some("Gheg-AL"), Some("-1")).unwrap();
        assert_eq!(filters.language_code.as_deref(), Some("Gheg-AL"));
        assert_eq!(filters.level, Some(-1));
    }

    #[test]
    fn test_learner_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(parse_learner(Some(&id.to_string())).unwrap(), Some(id));
        assert_eq!(parse_learner(Some("guest-user-42")).unwrap(), None);
        assert!(matches!(
            parse_learner(Some("42")),
            Err(CatalogError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_required_learner_rejects_missing_and_guest_ids() {
        let id = Uuid::new_v4();
        assert_eq!(require_learner(Some(&id.to_string())).unwrap(), id);
        for raw in [None, Some(""), Some("guest-user-7")] {
            assert!(matches!(
                require_learner(raw),
                Err(CatalogError::InvalidFilter(_))
            ));
        }
    }

    #[test]
    fn test_query_composes_predicates_in_order() {
        let filters = CourseFilters {
            language_code: Some("gheg-al".into()),
            level: Some(2),
        };
        let query = CourseQuery::from_filters(&filters);
        assert_eq!(
            query.predicates(),
            &[
                CoursePredicate::Active,
                CoursePredicate::LanguageCode("gheg-al".into()),
                CoursePredicate::Level(2),
            ]
        );
    }
}
