//! Parsing of `action-id` path segments such as `update-1234`.

use crate::error::RouteError;
use crate::session::EnrollmentMode;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// New enrollment for a relation
    Capture,
    /// Amend an existing enrollment
    Update,
    /// Image search and approval screen
    GetImagesCred,
    Enquiry,
    /// Relation details by encrypted id
    View,
    Approve,
}

impl RouteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteAction::Capture => "capture",
            RouteAction::Update => "update",
            RouteAction::GetImagesCred => "getimagescred",
            RouteAction::Enquiry => "enquiry",
            RouteAction::View => "view",
            RouteAction::Approve => "approve",
        }
    }

    /// Enrollment mode for wizard routes; `None` for the other screens
    pub fn enrollment_mode(&self) -> Option<EnrollmentMode> {
        match self {
            RouteAction::Capture => Some(EnrollmentMode::Add),
            RouteAction::Update => Some(EnrollmentMode::Amend),
            _ => None,
        }
    }
}

impl FromStr for RouteAction {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "capture" => Ok(RouteAction::Capture),
            "update" => Ok(RouteAction::Update),
            "getimagescred" => Ok(RouteAction::GetImagesCred),
            "enquiry" => Ok(RouteAction::Enquiry),
            "view" => Ok(RouteAction::View),
            "approve" => Ok(RouteAction::Approve),
            _ => Err(RouteError::UnknownAction {
                action: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub action: RouteAction,
    pub id: String,
}

impl Route {
    /// Split on the first `-`; the id keeps any further dashes
    pub fn parse(segment: &str) -> Result<Self, RouteError> {
        let segment = segment.trim().trim_matches('/');
        let (action, id) = segment
            .split_once('-')
            .filter(|(action, id)| !action.is_empty() && !id.is_empty())
            .ok_or_else(|| RouteError::Malformed {
                segment: segment.to_string(),
            })?;

        Ok(Self {
            action: action.parse()?,
            id: id.to_string(),
        })
    }

    pub fn enrollment_mode(&self) -> Option<EnrollmentMode> {
        self.action.enrollment_mode()
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::parse(s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.action, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_route() {
        let route = Route::parse("update-1234").unwrap();
        assert_eq!(route.action, RouteAction::Update);
        assert_eq!(route.id, "1234");
        assert_eq!(route.enrollment_mode(), Some(EnrollmentMode::Amend));
    }

    #[test]
    fn test_id_keeps_extra_dashes() {
        let route = Route::parse("/view-ab-cd-ef/").unwrap();
        assert_eq!(route.action, RouteAction::View);
        assert_eq!(route.id, "ab-cd-ef");
        assert_eq!(route.enrollment_mode(), None);
        assert_eq!(route.to_string(), "view-ab-cd-ef");
    }

    #[test]
    fn test_capture_is_add_mode() {
        let route: Route = "capture-REL01".parse().unwrap();
        assert_eq!(route.enrollment_mode(), Some(EnrollmentMode::Add));
    }

    #[test]
    fn test_malformed_segments() {
        for segment in ["update", "-1234", "update-", ""] {
            assert!(matches!(
                Route::parse(segment),
                Err(RouteError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_action() {
        assert_eq!(
            Route::parse("delete-1"),
            Err(RouteError::UnknownAction {
                action: "delete".to_string()
            })
        );
    }
}
