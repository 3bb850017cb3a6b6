use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use gravity_shared::errors::{AppError, AppResult, ErrorCode};
use gravity_shared::types::pagination::{PageRequest, Paginated, MAX_PAGE_SIZE};

use crate::geo::{km_to_m, GeoPoint};
use crate::models::FilterProfile;
use crate::services::presence;
use crate::store::{CandidateRow, ProfileRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchGender {
    Man,
    Woman,
    All,
}

impl SearchGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Man => "man",
            Self::Woman => "woman",
            Self::All => "all",
        }
    }
}

impl std::str::FromStr for SearchGender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "man" => Ok(Self::Man),
            "woman" => Ok(Self::Woman),
            "all" => Ok(Self::All),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

/// Discovery query string as received. Every field is optional and overrides the saved filter.
#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryParams {
    pub search_gender: Option<String>,
    pub age_from: Option<String>,
    pub age_to: Option<String>,
    pub distance: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// Parsed request overrides. Parsing is purely syntactic and touches no storage.
#[derive(Debug, Default, Clone)]
pub struct DiscoveryOverrides {
    pub search_gender: Option<SearchGender>,
    pub age_from: Option<u32>,
    pub age_to: Option<u32>,
    pub radius_km: Option<f64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub position: Option<GeoPoint>,
}

pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn parse_count(field: &str, value: &Option<String>) -> AppResult<Option<u32>> {
    present(value)
        .map(|v| {
            v.parse::<u32>().map_err(|_| {
                AppError::invalid_field(field, format!("{field} must be a non-negative integer"))
            })
        })
        .transpose()
}

impl DiscoveryOverrides {
    pub fn parse(params: &DiscoveryParams) -> AppResult<Self> {
        let search_gender = present(&params.search_gender)
            .map(|v| {
                v.parse::<SearchGender>().map_err(|_| {
                    AppError::invalid_field("search_gender", "search_gender must be man, woman or all")
                })
            })
            .transpose()?;

        let radius_km = present(&params.distance)
            .map(|v| match v.parse::<f64>() {
                Ok(km) if km.is_finite() => Ok(km),
                _ => Err(AppError::invalid_field("distance", "distance must be a number of kilometers")),
            })
            .transpose()?;

        Ok(Self {
            search_gender,
            age_from: parse_count("age_from", &params.age_from)?,
            age_to: parse_count("age_to", &params.age_to)?,
            radius_km,
            page: parse_count("page", &params.page)?,
            size: parse_count("size", &params.size)?,
            position: GeoPoint::parse_pair(params.latitude.as_deref(), params.longitude.as_deref())?,
        })
    }
}

/// Effective search preferences for one discovery call.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct DiscoveryFilter {
    pub search_gender: SearchGender,
    #[validate(range(max = 150))]
    pub age_from: u32,
    #[validate(range(max = 150))]
    pub age_to: u32,
    pub radius_km: f64,
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1, max = 100))]
    pub size: u32,
}

impl DiscoveryFilter {
    pub fn from_saved(saved: &FilterProfile) -> AppResult<Self> {
        let non_negative = |field: &str, value: i32| {
            u32::try_from(value)
                .map_err(|_| AppError::invalid_field(field, format!("saved {field} is negative")))
        };

        Ok(Self {
            search_gender: saved
                .search_gender
                .parse()
                .map_err(|e: String| AppError::invalid_field("search_gender", e))?,
            age_from: non_negative("age_from", saved.age_from)?,
            age_to: non_negative("age_to", saved.age_to)?,
            radius_km: saved.distance,
            page: non_negative("page", saved.page)?,
            size: non_negative("size", saved.size)?,
        })
    }

    pub fn merge(mut self, overrides: &DiscoveryOverrides) -> Self {
        if let Some(gender) = overrides.search_gender {
            self.search_gender = gender;
        }
        if let Some(age_from) = overrides.age_from {
            self.age_from = age_from;
        }
        if let Some(age_to) = overrides.age_to {
            self.age_to = age_to;
        }
        if let Some(radius_km) = overrides.radius_km {
            self.radius_km = radius_km;
        }
        if let Some(page) = overrides.page {
            self.page = page;
        }
        if let Some(size) = overrides.size {
            self.size = size;
        }
        self
    }

    /// Field ranges plus the cross-field rules.
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        if self.age_from > self.age_to {
            return Err(AppError::invalid_field("age_from", "age_from must not exceed age_to"));
        }
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            return Err(AppError::invalid_field("distance", "distance must be greater than zero"));
        }
        Ok(())
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size.min(MAX_PAGE_SIZE))
    }

    /// The saved row updated with these preferences.
    pub fn write_back(&self, saved: &FilterProfile) -> FilterProfile {
        FilterProfile {
            search_gender: self.search_gender.as_str().to_string(),
            age_from: self.age_from as i32,
            age_to: self.age_to as i32,
            distance: self.radius_km,
            page: self.page as i32,
            size: self.size as i32,
            ..saved.clone()
        }
    }
}

/// Inclusive birthday range for everyone aged `age_from..=age_to` on `today`.
pub fn birth_window(today: NaiveDate, age_from: u32, age_to: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let out_of_range = |field: &str| AppError::invalid_field(field, format!("{field} is out of range"));

    let birth_from = today
        .checked_sub_months(Months::new((age_to + 1) * 12))
        .and_then(|d| d.succ_opt())
        .ok_or_else(|| out_of_range("age_to"))?;
    let birth_to = today
        .checked_sub_months(Months::new(age_from * 12))
        .ok_or_else(|| out_of_range("age_from"))?;

    Ok((birth_from, birth_to))
}

/// Store-level description of one discovery page.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryQuery {
    pub viewer_id: i64,
    pub origin: GeoPoint,
    pub birth_from: NaiveDate,
    pub birth_to: NaiveDate,
    pub gender: SearchGender,
    pub radius_m: f64,
    pub offset: u64,
    pub limit: u32,
}

pub fn plan(viewer_id: i64, origin: GeoPoint, filter: &DiscoveryFilter, today: NaiveDate) -> AppResult<DiscoveryQuery> {
    let (birth_from, birth_to) = birth_window(today, filter.age_from, filter.age_to)?;
    let page = filter.page_request();

    Ok(DiscoveryQuery {
        viewer_id,
        origin,
        birth_from,
        birth_to,
        gender: filter.search_gender,
        radius_m: km_to_m(filter.radius_km),
        offset: page.offset(),
        limit: page.limit(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: i64,
    pub display_name: String,
    pub age: u32,
    pub gender: String,
    pub is_online: bool,
    pub last_active: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    pub image: Option<String>,
}

fn to_candidate(repo: &dyn ProfileRepository, row: CandidateRow, now: DateTime<Utc>) -> AppResult<Candidate> {
    let image = repo.public_images(row.profile.id)?.into_iter().next().map(|i| i.url);
    let profile = row.profile;

    Ok(Candidate {
        id: profile.id,
        age: profile.age_on(now.date_naive()),
        is_online: presence::is_online(profile.last_active, now),
        last_active: profile.last_active,
        distance_m: profile.is_show_distance.then_some(row.distance_m),
        display_name: profile.display_name,
        gender: profile.gender,
        image,
    })
}

/// Runs discovery for `viewer_id`, checking the viewer in as a side effect.
pub fn discover(
    repo: &dyn ProfileRepository,
    viewer_id: i64,
    overrides: &DiscoveryOverrides,
    now: DateTime<Utc>,
) -> AppResult<Paginated<Candidate>> {
    let viewer = super::require_active(repo, viewer_id)?;

    let saved = repo
        .find_filter(viewer.id)?
        .ok_or_else(|| AppError::new(ErrorCode::FilterNotFound, "discovery filter not found"))?;
    let filter = DiscoveryFilter::from_saved(&saved)?.merge(overrides);
    filter.check()?;

    presence::check_in(repo, viewer.id, overrides.position, now)?;

    let updated = filter.write_back(&saved);
    if updated != saved {
        repo.save_filter(&updated)?;
    }

    let navigator = repo.find_navigator(viewer.id)?.ok_or_else(|| {
        AppError::new(ErrorCode::NavigatorNotFound, "location is required for discovery")
    })?;

    let query = plan(viewer.id, navigator.point(), &filter, now.date_naive())?;
    let rows = repo.find_candidates(&query)?;
    let total = repo.count_candidates(&query)?;

    let items = rows
        .into_iter()
        .map(|row| to_candidate(repo, row, now))
        .collect::<AppResult<Vec<_>>>()?;

    tracing::debug!(
        viewer_id,
        total,
        returned = items.len(),
        radius_m = query.radius_m,
        "discovery completed"
    );

    Ok(Paginated::new(items, total, &filter.page_request()))
}

// ─── Tests ───

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{distance_m, EARTH_RADIUS_M};
    use crate::services::moderation;
    use crate::store::memory::MemoryRepository;
    use chrono::Duration;

    const ORIGIN: (f64, f64) = (55.7558, 37.6173);

    fn now() -> DateTime<Utc> {
        "2026-10-14T12:00:00Z".parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Latitude `meters` due north of the origin.
    fn north(meters: f64) -> f64 {
        ORIGIN.0 + (meters / EARTH_RADIUS_M).to_degrees()
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(ORIGIN.0, ORIGIN.1).unwrap()
    }

    /// Viewer aged 30, seeking women 18–40 within 10 km.
    fn viewer(repo: &MemoryRepository) -> i64 {
        let id = repo.add_profile("viewer", "man", date(1996, 3, 1), now());
        repo.place(id, ORIGIN.0, ORIGIN.1);
        repo.add_filter(id, "woman", 18, 40, 10.0);
        id
    }

    fn woman_at(repo: &MemoryRepository, name: &str, meters: f64, last_active: DateTime<Utc>) -> i64 {
        let id = repo.add_profile(name, "woman", date(1998, 5, 1), last_active);
        repo.place(id, north(meters), ORIGIN.1);
        id
    }

    fn query(viewer_id: i64, radius_m: f64) -> DiscoveryQuery {
        DiscoveryQuery {
            viewer_id,
            origin: origin(),
            birth_from: date(1900, 1, 1),
            birth_to: date(2026, 1, 1),
            gender: SearchGender::All,
            radius_m,
            offset: 0,
            limit: 100,
        }
    }

    #[test]
    fn birth_window_is_age_as_of_today() {
        let (from, to) = birth_window(date(2026, 10, 14), 25, 30).unwrap();
        // turns 31 tomorrow, still 30 today
        assert_eq!(from, date(1995, 10, 15));
        // 25th birthday today
        assert_eq!(to, date(2001, 10, 14));
    }

    #[test]
    fn plan_converts_units_and_pages() {
        let filter = DiscoveryFilter {
            search_gender: SearchGender::Woman,
            age_from: 18,
            age_to: 40,
            radius_km: 2.5,
            page: 3,
            size: 20,
        };
        let q = plan(7, origin(), &filter, date(2026, 10, 14)).unwrap();
        assert_eq!(q.radius_m, 2500.0);
        assert_eq!(q.offset, 40);
        assert_eq!(q.limit, 20);
        assert_eq!(q.gender, SearchGender::Woman);
    }

    #[test]
    fn malformed_numbers_name_the_field() {
        let cases = [
            DiscoveryParams { age_from: Some("abc".into()), ..Default::default() },
            DiscoveryParams { age_to: Some("-3".into()), ..Default::default() },
            DiscoveryParams { distance: Some("ten".into()), ..Default::default() },
            DiscoveryParams { page: Some("1.5".into()), ..Default::default() },
            DiscoveryParams { size: Some("x".into()), ..Default::default() },
        ];
        let fields = ["age_from", "age_to", "distance", "page", "size"];

        for (params, field) in cases.iter().zip(fields) {
            match DiscoveryOverrides::parse(params) {
                Err(AppError::Known { code, details: Some(d), .. }) => {
                    assert_eq!(code, ErrorCode::ValidationError);
                    assert_eq!(d["field"], field);
                }
                other => panic!("expected validation error for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn semantic_rules_reject_before_any_write() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        let before = repo.profile(v).last_active - Duration::hours(1);
        repo.update_profile(v, |p| p.last_active = before);

        let overrides = DiscoveryOverrides { age_from: Some(40), age_to: Some(30), ..Default::default() };
        let err = discover(&repo, v, &overrides, now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let overrides = DiscoveryOverrides { radius_km: Some(0.0), ..Default::default() };
        let err = discover(&repo, v, &overrides, now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let overrides = DiscoveryOverrides { size: Some(0), ..Default::default() };
        let err = discover(&repo, v, &overrides, now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        assert_eq!(repo.profile(v).last_active, before);
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        let c = woman_at(&repo, "edge", 3_000.0, now());
        let exact = distance_m(origin(), repo.find_navigator(c).unwrap().unwrap().point());

        let hits = repo.find_candidates(&query(v, exact)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].profile.id, c);

        let misses = repo.find_candidates(&query(v, exact - 1e-6)).unwrap();
        assert!(misses.is_empty());
    }

    #[test]
    fn orders_by_distance_then_recent_activity() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        let far = woman_at(&repo, "far", 4_000.0, now());
        let stale = woman_at(&repo, "stale", 1_000.0, now() - Duration::hours(2));
        let fresh = woman_at(&repo, "fresh", 1_000.0, now() - Duration::minutes(1));

        let page = discover(&repo, v, &DiscoveryOverrides::default(), now()).unwrap();
        let ids: Vec<i64> = page.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![fresh, stale, far]);
    }

    #[test]
    fn page_two_of_twenty_five() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        let ids: Vec<i64> = (1..=25)
            .map(|i| woman_at(&repo, &format!("c{i}"), f64::from(i) * 100.0, now()))
            .collect();

        let overrides = DiscoveryOverrides { page: Some(2), size: Some(10), ..Default::default() };
        let page = discover(&repo, v, &overrides, now()).unwrap();

        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        let got: Vec<i64> = page.items.iter().map(|c| c.id).collect();
        assert_eq!(got, ids[10..20].to_vec());
    }

    #[test]
    fn excludes_self_deleted_suspended_and_out_of_age() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        let visible = woman_at(&repo, "ok", 500.0, now());
        let deleted = woman_at(&repo, "deleted", 500.0, now());
        let suspended = woman_at(&repo, "suspended", 500.0, now());
        let too_old = repo.add_profile("old", "woman", date(1970, 1, 1), now());
        repo.place(too_old, north(500.0), ORIGIN.1);
        let man = repo.add_profile("man", "man", date(1998, 5, 1), now());
        repo.place(man, north(500.0), ORIGIN.1);
        repo.update_profile(deleted, |p| p.is_deleted = true);
        repo.update_profile(suspended, |p| p.is_blocked = true);

        let page = discover(&repo, v, &DiscoveryOverrides::default(), now()).unwrap();
        let ids: Vec<i64> = page.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![visible]);
        assert_eq!(page.total, 1);
    }

    #[test]
    fn gender_all_matches_everyone() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        woman_at(&repo, "w", 500.0, now());
        let m = repo.add_profile("m", "man", date(1998, 5, 1), now());
        repo.place(m, north(600.0), ORIGIN.1);

        let overrides = DiscoveryOverrides { search_gender: Some(SearchGender::All), ..Default::default() };
        let page = discover(&repo, v, &overrides, now()).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(repo.find_filter(v).unwrap().unwrap().search_gender, "all");
    }

    #[test]
    fn one_block_call_hides_both_sides() {
        let repo = MemoryRepository::new();
        let a = viewer(&repo);
        let b = woman_at(&repo, "b", 800.0, now());
        repo.add_filter(b, "man", 18, 40, 10.0);

        moderation::submit_block(&repo, a, b, now()).unwrap();

        let a_sees = discover(&repo, a, &DiscoveryOverrides::default(), now()).unwrap();
        assert!(a_sees.items.iter().all(|c| c.id != b));
        let b_sees = discover(&repo, b, &DiscoveryOverrides::default(), now()).unwrap();
        assert!(b_sees.items.iter().all(|c| c.id != a));
    }

    #[test]
    fn missing_navigator_fails_explicitly() {
        let repo = MemoryRepository::new();
        let v = repo.add_profile("nomad", "man", date(1996, 3, 1), now());
        repo.add_filter(v, "woman", 18, 40, 10.0);

        let err = discover(&repo, v, &DiscoveryOverrides::default(), now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NavigatorNotFound);
    }

    #[test]
    fn check_in_position_enables_discovery() {
        let repo = MemoryRepository::new();
        let v = repo.add_profile("nomad", "man", date(1996, 3, 1), now() - Duration::days(1));
        repo.add_filter(v, "woman", 18, 40, 10.0);
        let c = woman_at(&repo, "c", 1_000.0, now());

        let overrides = DiscoveryOverrides { position: Some(origin()), ..Default::default() };
        let page = discover(&repo, v, &overrides, now()).unwrap();
        assert_eq!(page.items[0].id, c);
        assert_eq!(repo.profile(v).last_active, now());
    }

    #[test]
    fn missing_filter_is_not_found() {
        let repo = MemoryRepository::new();
        let v = repo.add_profile("v", "man", date(1996, 3, 1), now());
        repo.place(v, ORIGIN.0, ORIGIN.1);

        let err = discover(&repo, v, &DiscoveryOverrides::default(), now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FilterNotFound);
    }

    #[test]
    fn only_first_public_image_is_attached() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        let c = woman_at(&repo, "c", 500.0, now());
        repo.add_image(c, "private.jpg", true);
        repo.add_image(c, "first.jpg", false);
        repo.add_image(c, "second.jpg", false);

        let page = discover(&repo, v, &DiscoveryOverrides::default(), now()).unwrap();
        assert_eq!(page.items[0].image.as_deref(), Some("first.jpg"));
    }

    #[test]
    fn hidden_distance_is_not_reported() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        let c = woman_at(&repo, "c", 500.0, now());
        repo.update_profile(c, |p| p.is_show_distance = false);

        let page = discover(&repo, v, &DiscoveryOverrides::default(), now()).unwrap();
        assert_eq!(page.items[0].id, c);
        assert!(page.items[0].distance_m.is_none());
    }

    #[test]
    fn nearby_active_candidate_comes_first_and_online() {
        let repo = MemoryRepository::new();
        let v = repo.add_profile("V", "man", date(1996, 3, 1), now());
        repo.place(v, ORIGIN.0, ORIGIN.1);
        repo.add_filter(v, "woman", 18, 40, 10.0);
        assert_eq!(repo.profile(v).age_on(now().date_naive()), 30);

        let c = repo.add_profile("C", "woman", date(1998, 5, 1), now() - Duration::minutes(1));
        repo.place(c, north(5_000.0), ORIGIN.1);
        let far = repo.add_profile("F", "woman", date(1998, 5, 1), now());
        repo.place(far, north(9_000.0), ORIGIN.1);

        let page = discover(&repo, v, &DiscoveryOverrides::default(), now()).unwrap();
        let first = &page.items[0];
        assert_eq!(first.id, c);
        assert_eq!(first.age, 28);
        assert!(first.is_online);
        assert!((first.distance_m.unwrap() - 5_000.0).abs() < 1e-3);
    }

    #[test]
    fn overrides_are_persisted_as_saved_filter() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);

        let overrides = DiscoveryOverrides { age_from: Some(21), radius_km: Some(3.0), ..Default::default() };
        discover(&repo, v, &overrides, now()).unwrap();

        let saved = repo.find_filter(v).unwrap().unwrap();
        assert_eq!(saved.age_from, 21);
        assert_eq!(saved.age_to, 40);
        assert_eq!(saved.distance, 3.0);
    }

    #[test]
    fn suspended_viewer_cannot_discover() {
        let repo = MemoryRepository::new();
        let v = viewer(&repo);
        repo.update_profile(v, |p| p.is_blocked = true);

        let err = discover(&repo, v, &DiscoveryOverrides::default(), now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProfileSuspended);
    }
}
