// Catalog filtering, sorting and facet derivation.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::models::{Course, FilterConfig, SortBy};

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub categories: BTreeSet<String>,
    pub tutors: BTreeSet<String>,
}

fn criterion(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty() && *s != "all")
}

impl FilterConfig {
    /// True when no filter criterion is active.
    pub fn is_identity(&self) -> bool {
        criterion(&self.category).is_none()
            && criterion(&self.difficulty).is_none()
            && criterion(&self.tutor).is_none()
            && self.search.as_deref().map_or(true, str::is_empty)
    }

    /// Conjunction of every active criterion.
    pub fn matches(&self, course: &Course) -> bool {
        if let Some(category) = criterion(&self.category) {
            if course.category != category {
                return false;
            }
        }
        if let Some(difficulty) = criterion(&self.difficulty) {
            if course.difficulty.as_str() != difficulty {
                return false;
            }
        }
        if let Some(tutor) = criterion(&self.tutor) {
            if course.tutor_id.as_deref() != Some(tutor) {
                return false;
            }
        }
        match self.search.as_deref() {
            Some(term) if !term.is_empty() => matches_search(course, &term.to_lowercase()),
            _ => true,
        }
    }
}

fn matches_search(course: &Course, term: &str) -> bool {
    [
        Some(course.title.as_str()),
        Some(course.description.as_str()),
        Some(course.category.as_str()),
        course.tutor_name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(term))
}

/// Filters then sorts a snapshot of courses. The input is never modified.
pub fn apply(courses: &[Course], config: &FilterConfig) -> Vec<Course> {
    let mut result: Vec<Course> = if config.is_identity() {
        courses.to_vec()
    } else {
        courses
            .iter()
            .filter(|c| config.matches(c))
            .cloned()
            .collect()
    };
    if let Some(sort_by) = config.sort_by {
        sort_courses(&mut result, sort_by);
    }
    result
}

// slice::sort_by is stable, equal keys keep their input order
fn sort_courses(courses: &mut [Course], sort_by: SortBy) {
    match sort_by {
        SortBy::Newest => courses.sort_by(|a, b| created_key(b).cmp(&created_key(a))),
        SortBy::Oldest => courses.sort_by_key(created_key),
        SortBy::Popular => courses.sort_by(|a, b| b.enrolled_count.cmp(&a.enrolled_count)),
        SortBy::Rating => courses.sort_by(|a, b| rating_key(b).total_cmp(&rating_key(a))),
        SortBy::TitleAsc => courses.sort_by(|a, b| locale_cmp(&a.title, &b.title)),
        SortBy::TitleDesc => courses.sort_by(|a, b| locale_cmp(&b.title, &a.title)),
    }
}

fn created_key(course: &Course) -> i64 {
    course.created_at.map(|t| t.timestamp_millis()).unwrap_or(0)
}

fn rating_key(course: &Course) -> f64 {
    if course.rating.is_nan() {
        0.0
    } else {
        course.rating
    }
}

/// Accent- and case-insensitive comparison. Ties fall back to the accented
/// form, then lowercase before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

// NFD with combining marks dropped, lowercased
fn collation_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Distinct categories and tutor ids of the unfiltered list.
pub fn derive_facets(courses: &[Course]) -> Facets {
    let mut facets = Facets::default();
    for course in courses {
        if !course.category.is_empty() {
            facets.categories.insert(course.category.clone());
        }
        if let Some(tutor) = course.tutor_id.as_deref().filter(|t| !t.is_empty()) {
            facets.tutors.insert(tutor.to_string());
        }
    }
    facets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;
    use chrono::{TimeZone, Utc};

    fn course(title: &str, category: &str, difficulty: &str, enrolled: u32) -> Course {
        let mut c = Course::new(title);
        c.category = category.into();
        c.difficulty = Difficulty::from(difficulty);
        c.enrolled_count = enrolled;
        c
    }

    fn catalog() -> Vec<Course> {
        let mut a = course("Intro to Graphs", "CS", "beginner", 10);
        a.tutor_id = Some("tutor-1".into());
        a.tutor_name = Some("Ada Lovelace".into());
        a.created_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        a.rating = 4.5;

        let mut b = course("Advanced Trees", "CS", "advanced", 50);
        b.tutor_id = Some("tutor-2".into());
        b.created_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        b.rating = 3.9;

        let mut c = course("watercolor basics", "Art", "beginner", 50);
        c.description = "Painting with water and patience".into();
        c.tutor_id = Some("tutor-1".into());
        c.tutor_name = Some("Ada Lovelace".into());
        c.rating = 4.5;

        let d = course("Linked Lists", "CS", "intermediate", 0);

        vec![a, b, c, d]
    }

    fn titles(courses: &[Course]) -> Vec<&str> {
        courses.iter().map(|c| c.title.as_str()).collect()
    }

    fn cfg(sort_by: SortBy) -> FilterConfig {
        FilterConfig {
            sort_by: Some(sort_by),
            ..Default::default()
        }
    }

    #[test]
    fn identity_config_keeps_input_order() {
        let courses = catalog();
        let config = FilterConfig {
            category: Some("all".into()),
            difficulty: Some("all".into()),
            tutor: Some("all".into()),
            search: Some(String::new()),
            sort_by: None,
        };
        assert!(config.is_identity());
        assert_eq!(apply(&courses, &config), courses);
        assert_eq!(apply(&courses, &FilterConfig::default()), courses);
    }

    #[test]
    fn every_result_satisfies_the_filter() {
        let courses = catalog();
        let configs = [
            FilterConfig {
                category: Some("CS".into()),
                ..Default::default()
            },
            FilterConfig {
                difficulty: Some("beginner".into()),
                tutor: Some("tutor-1".into()),
                ..Default::default()
            },
            FilterConfig {
                search: Some("ADA".into()),
                sort_by: Some(SortBy::TitleAsc),
                ..Default::default()
            },
            FilterConfig {
                category: Some("CS".into()),
                search: Some("tree".into()),
                sort_by: Some(SortBy::Rating),
                ..Default::default()
            },
        ];
        for config in &configs {
            let out = apply(&courses, config);
            assert!(!out.is_empty(), "{config:?} should match something");
            assert!(out.iter().all(|c| config.matches(c)));
            let expected = courses.iter().filter(|c| config.matches(c)).count();
            assert_eq!(out.len(), expected);
        }
    }

    #[test]
    fn popular_scenario_orders_by_enrollment() {
        let courses = vec![
            course("Intro to Graphs", "CS", "beginner", 10),
            course("Advanced Trees", "CS", "advanced", 50),
        ];
        let config = FilterConfig {
            category: Some("CS".into()),
            difficulty: Some("all".into()),
            tutor: Some("all".into()),
            search: Some(String::new()),
            sort_by: Some(SortBy::Popular),
        };
        let out = apply(&courses, &config);
        assert_eq!(titles(&out), vec!["Advanced Trees", "Intro to Graphs"]);
    }

    #[test]
    fn equal_keys_keep_relative_order() {
        let courses = catalog();
        let out = apply(&courses, &cfg(SortBy::Popular));
        // "Advanced Trees" and "watercolor basics" both have 50 enrolments
        assert_eq!(
            titles(&out),
            vec!["Advanced Trees", "watercolor basics", "Intro to Graphs", "Linked Lists"]
        );

        let out = apply(&courses, &cfg(SortBy::Rating));
        assert_eq!(
            titles(&out),
            vec!["Intro to Graphs", "watercolor basics", "Advanced Trees", "Linked Lists"]
        );
    }

    #[test]
    fn missing_timestamps_sort_as_epoch() {
        let courses = catalog();
        let newest = apply(&courses, &cfg(SortBy::Newest));
        assert_eq!(
            titles(&newest),
            vec!["Advanced Trees", "Intro to Graphs", "watercolor basics", "Linked Lists"]
        );
        let oldest = apply(&courses, &cfg(SortBy::Oldest));
        assert_eq!(
            titles(&oldest),
            vec!["watercolor basics", "Linked Lists", "Intro to Graphs", "Advanced Trees"]
        );
    }

    #[test]
    fn title_sort_ignores_case() {
        let courses = catalog();
        let asc = apply(&courses, &cfg(SortBy::TitleAsc));
        assert_eq!(
            titles(&asc),
            vec!["Advanced Trees", "Intro to Graphs", "Linked Lists", "watercolor basics"]
        );
        let desc = apply(&courses, &cfg(SortBy::TitleDesc));
        assert_eq!(
            titles(&desc),
            vec!["watercolor basics", "Linked Lists", "Intro to Graphs", "Advanced Trees"]
        );
        assert_eq!(locale_cmp("apple", "Apple"), Ordering::Less);
        assert_eq!(locale_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn title_sort_ignores_accents() {
        let courses = vec![
            Course::new("Zebra Patterns"),
            Course::new("Éclair Baking"),
            Course::new("eclair basics"),
            Course::new("Ölmalerei"),
        ];
        let asc = apply(&courses, &cfg(SortBy::TitleAsc));
        assert_eq!(
            titles(&asc),
            vec!["Éclair Baking", "eclair basics", "Ölmalerei", "Zebra Patterns"]
        );
        assert_eq!(locale_cmp("eclair", "éclair"), Ordering::Less);
        assert_eq!(locale_cmp("éclair", "Éclair"), Ordering::Less);
    }

    #[test]
    fn search_covers_every_text_field() {
        let courses = catalog();
        let search = |term: &str| {
            let config = FilterConfig {
                search: Some(term.into()),
                sort_by: Some(SortBy::TitleAsc),
                ..Default::default()
            };
            apply(&courses, &config)
                .into_iter()
                .map(|c| c.title)
                .collect::<Vec<_>>()
        };
        assert_eq!(search("graphs"), vec!["Intro to Graphs"]);
        assert_eq!(search("PATIENCE"), vec!["watercolor basics"]);
        assert_eq!(search("art"), vec!["watercolor basics"]);
        assert_eq!(search("lovelace"), vec!["Intro to Graphs", "watercolor basics"]);
        assert!(search("quantum").is_empty());
    }

    #[test]
    fn unknown_difficulty_matches_exactly() {
        let mut courses = catalog();
        courses[3].difficulty = Difficulty::from("expert");
        let config = FilterConfig {
            difficulty: Some("expert".into()),
            ..Default::default()
        };
        assert_eq!(titles(&apply(&courses, &config)), vec!["Linked Lists"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(apply(&[], &cfg(SortBy::Popular)).is_empty());
        assert_eq!(derive_facets(&[]), Facets::default());
    }

    #[test]
    fn facets_come_from_the_unfiltered_list() {
        let mut courses = catalog();
        courses[3].tutor_id = Some(String::new());
        let facets = derive_facets(&courses);
        assert_eq!(
            facets.categories.into_iter().collect::<Vec<_>>(),
            vec!["Art", "CS"]
        );
        assert_eq!(
            facets.tutors.into_iter().collect::<Vec<_>>(),
            vec!["tutor-1", "tutor-2"]
        );
    }
}
