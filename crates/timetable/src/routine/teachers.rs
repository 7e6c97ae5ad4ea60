//! Narrowing the teacher choices to those eligible for a subject.
//!
//! The subject's own teacher associations are the source of truth: taken from
//! the subject listing when it embeds them, fetched from
//! `/subject/:id/teachers` otherwise. Nothing is cached across subjects; each
//! subject change throws the previous list away, and a lookup that returns
//! after a newer one was started is ignored.

use super::api::TimetableApi;
use super::error::TimetableResult;
use super::fence::{Generation, RequestFence};
use super::types::{Subject, Teacher};
use tracing::{debug, warn};

/// An in-flight lookup for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeacherLookup {
    pub subject_id: i64,
    generation: Generation,
}

impl TeacherLookup {
    pub async fn run(self, api: &dyn TimetableApi) -> TeacherLookupResult {
        let outcome = api.subject_teachers(self.subject_id).await;
        TeacherLookupResult {
            lookup: self,
            outcome,
        }
    }
}

#[derive(Debug)]
pub struct TeacherLookupResult {
    pub lookup: TeacherLookup,
    pub outcome: TimetableResult<Vec<Teacher>>,
}

/// What selecting a subject requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The list is already final (unset subject or embedded teachers)
    Ready,
    /// The list is empty until this lookup completes
    Pending(TeacherLookup),
}

#[derive(Debug, Default)]
pub struct TeacherAvailabilityResolver {
    subject_id: Option<i64>,
    teachers: Vec<Teacher>,
    fence: RequestFence,
}

impl TeacherAvailabilityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject_id(&self) -> Option<i64> {
        self.subject_id
    }

    /// Teachers eligible for the current subject.
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn is_eligible(&self, email: &str) -> bool {
        self.teachers.iter().any(|t| t.email == email)
    }

    /// Forgets the subject and its teachers; pending lookups become stale.
    pub fn clear(&mut self) {
        self.fence.invalidate();
        self.subject_id = None;
        self.teachers.clear();
    }

    /// Switches to `subject_id`, discarding the previous list.
    pub fn begin(&mut self, subject_id: Option<i64>, subjects: &[Subject]) -> Resolution {
        self.clear();
        let Some(subject_id) = subject_id else {
            return Resolution::Ready;
        };
        self.subject_id = Some(subject_id);

        let embedded = subjects
            .iter()
            .find(|s| s.id == subject_id)
            .and_then(|s| s.teachers.as_ref());
        if let Some(teachers) = embedded {
            debug!(subject_id, count = teachers.len(), "Using embedded subject teachers");
            self.teachers = teachers.clone();
            return Resolution::Ready;
        }

        Resolution::Pending(TeacherLookup {
            subject_id,
            generation: self.fence.issue(),
        })
    }

    /// Applies a finished lookup.
    ///
    /// Returns `Ok(false)` when the lookup was superseded and ignored. A failed
    /// lookup leaves the list empty and hands the error back for reporting.
    pub fn apply(&mut self, result: TeacherLookupResult) -> TimetableResult<bool> {
        let TeacherLookupResult { lookup, outcome } = result;
        if !self.fence.is_current(lookup.generation) || self.subject_id != Some(lookup.subject_id)
        {
            debug!(
                subject_id = lookup.subject_id,
                generation = %lookup.generation,
                "Discarding stale teacher lookup"
            );
            return Ok(false);
        }

        match outcome {
            Ok(teachers) => {
                debug!(subject_id = lookup.subject_id, count = teachers.len(), "Teachers resolved");
                self.teachers = teachers;
                Ok(true)
            }
            Err(e) => {
                warn!(subject_id = lookup.subject_id, error = %e, "Failed to fetch teachers for subject");
                self.teachers.clear();
                Err(e)
            }
        }
    }

    /// Selects `subject_id` and waits for its teachers.
    pub async fn resolve(
        &mut self,
        api: &dyn TimetableApi,
        subjects: &[Subject],
        subject_id: Option<i64>,
    ) -> TimetableResult<&[Teacher]> {
        if let Resolution::Pending(lookup) = self.begin(subject_id, subjects) {
            let result = lookup.run(api).await;
            self.apply(result)?;
        }
        Ok(self.teachers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::error::TimetableError;

    fn teacher(email: &str) -> Teacher {
        Teacher {
            email: email.to_string(),
            name: email.to_string(),
            designation: "Lecturer".to_string(),
            department: None,
        }
    }

    fn result(lookup: TeacherLookup, outcome: TimetableResult<Vec<Teacher>>) -> TeacherLookupResult {
        TeacherLookupResult { lookup, outcome }
    }

    #[test]
    fn test_unset_subject_is_empty() {
        let mut resolver = TeacherAvailabilityResolver::new();
        assert_eq!(resolver.begin(None, &[]), Resolution::Ready);
        assert!(resolver.teachers().is_empty());
        assert_eq!(resolver.subject_id(), None);
    }

    #[test]
    fn test_embedded_teachers_need_no_lookup() {
        let subjects = vec![Subject {
            id: 7,
            name: "Compiler Design".to_string(),
            subject_code: None,
            department: None,
            teachers: Some(vec![teacher("a@example.edu")]),
        }];
        let mut resolver = TeacherAvailabilityResolver::new();
        assert_eq!(resolver.begin(Some(7), &subjects), Resolution::Ready);
        assert!(resolver.is_eligible("a@example.edu"));
    }

    #[test]
    fn test_subject_without_teachers_yields_empty_list() {
        let mut resolver = TeacherAvailabilityResolver::new();
        let Resolution::Pending(lookup) = resolver.begin(Some(3), &[]) else {
            panic!("expected a lookup");
        };
        assert_eq!(resolver.apply(result(lookup, Ok(vec![]))), Ok(true));
        assert!(resolver.teachers().is_empty());
    }

    #[test]
    fn test_stale_lookup_is_ignored() {
        let mut resolver = TeacherAvailabilityResolver::new();
        let Resolution::Pending(first) = resolver.begin(Some(1), &[]) else {
            panic!("expected a lookup");
        };
        let Resolution::Pending(second) = resolver.begin(Some(2), &[]) else {
            panic!("expected a lookup");
        };

        assert_eq!(resolver.apply(result(second, Ok(vec![teacher("two@x.edu")]))), Ok(true));
        assert_eq!(resolver.apply(result(first, Ok(vec![teacher("one@x.edu")]))), Ok(false));
        assert!(resolver.is_eligible("two@x.edu"));
        assert!(!resolver.is_eligible("one@x.edu"));
    }

    #[test]
    fn test_failed_lookup_empties_list() {
        let mut resolver = TeacherAvailabilityResolver::new();
        let Resolution::Pending(lookup) = resolver.begin(Some(4), &[]) else {
            panic!("expected a lookup");
        };
        let err = TimetableError::Network {
            message: "timed out".to_string(),
        };
        assert_eq!(resolver.apply(result(lookup, Err(err.clone()))), Err(err));
        assert!(resolver.teachers().is_empty());
    }
}
