//! Process-wide TTL cache for HR API data.
//!
//! Tokens, employee records, team rosters and attendance pages each expire
//! on their own schedule; database ids never do.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{dates::DateRange, employee::Employee};

pub const TOKEN_TTL: Duration = Duration::from_secs(8 * 60 * 60);
pub const EMPLOYEE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const TEAM_TTL: Duration = Duration::from_secs(12 * 60 * 60);
pub const ATTENDANCE_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

struct TtlMap<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlMap<V> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn is_live(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    fn prune(&self, entries: &mut HashMap<String, Entry<V>>, now: Instant) {
        entries.retain(|_, entry| self.is_live(entry, now));
    }

    fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Live value for `key`; an expired entry is removed on the way out.
    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        {
            let entries = self.entries.read();
            let entry = entries.get(key)?;
            if self.is_live(entry, now) {
                return Some(entry.value.clone());
            }
        }
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| !self.is_live(entry, now)) {
            entries.remove(key);
        }
        None
    }

    fn set(&self, key: impl Into<String>, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.write();
        self.prune(&mut entries, now);
        entries.insert(
            key.into(),
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn retain_keys(&self, keep: impl Fn(&str) -> bool) {
        self.entries.write().retain(|k, _| keep(k));
    }

    /// Number of live entries; expired ones are dropped first.
    fn len(&self) -> usize {
        let mut entries = self.entries.write();
        self.prune(&mut entries, Instant::now());
        entries.len()
    }
}

#[derive(Debug, Clone)]
pub struct CachedTeam {
    pub data: Value,
    pub employee_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub tokens: usize,
    pub employee_data: usize,
    pub db_ids: usize,
    pub team_data: usize,
    pub attendance_data: usize,
}

pub struct HrCache {
    tokens: TtlMap<String>,
    employees: TtlMap<Employee>,
    db_ids: RwLock<HashMap<String, String>>,
    teams: TtlMap<CachedTeam>,
    attendance: TtlMap<Value>,
}

impl Default for HrCache {
    fn default() -> Self {
        Self::with_ttls(TOKEN_TTL, EMPLOYEE_TTL, TEAM_TTL, ATTENDANCE_TTL)
    }
}

fn attendance_key(subject: &str, range: &DateRange) -> String {
    format!("{subject}_{}_{}", range.start(), range.end())
}

impl HrCache {
    fn with_ttls(token: Duration, employee: Duration, team: Duration, attendance: Duration) -> Self {
        Self {
            tokens: TtlMap::new(token),
            employees: TtlMap::new(employee),
            db_ids: RwLock::new(HashMap::new()),
            teams: TtlMap::new(team),
            attendance: TtlMap::new(attendance),
        }
    }

    pub fn token(&self, employee_id: &str) -> Option<String> {
        let token = self.tokens.get(employee_id);
        if token.is_some() {
            debug!(employee_id, "using cached token");
        }
        token
    }

    pub fn set_token(&self, employee_id: &str, token: &str) {
        self.tokens.set(employee_id, token.to_string());
    }

    pub fn employee(&self, employee_id: &str) -> Option<Employee> {
        self.employees.get(employee_id)
    }

    /// Stores the record and, when present, its database id.
    pub fn set_employee(&self, employee_id: &str, employee: &Employee) {
        self.employees.set(employee_id, employee.clone());
        if let Some(db_id) = &employee.db_id {
            self.db_ids
                .write()
                .insert(employee_id.to_string(), db_id.clone());
        }
    }

    pub fn db_id(&self, employee_id: &str) -> Option<String> {
        self.db_ids.read().get(employee_id).cloned()
    }

    pub fn team(&self, manager_id: &str) -> Option<CachedTeam> {
        self.teams.get(manager_id)
    }

    pub fn set_team(&self, manager_id: &str, team: CachedTeam) {
        debug!(manager_id, members = team.employee_ids.len(), "team data cached");
        self.teams.set(manager_id, team);
    }

    pub fn attendance(&self, subject: &str, range: &DateRange) -> Option<Value> {
        self.attendance.get(&attendance_key(subject, range))
    }

    pub fn set_attendance(&self, subject: &str, range: &DateRange, data: Value) {
        self.attendance.set(attendance_key(subject, range), data);
    }

    /// Drops everything cached for an employee, including attendance pages
    /// keyed by them (personal or as a team's manager).
    pub fn clear_employee(&self, employee_id: &str) {
        self.tokens.remove(employee_id);
        self.employees.remove(employee_id);
        self.db_ids.write().remove(employee_id);
        self.teams.remove(employee_id);

        let personal = format!("{employee_id}_");
        let team = format!("team_{employee_id}_");
        self.attendance
            .retain_keys(|k| !k.starts_with(&personal) && !k.starts_with(&team));
        info!(employee_id, "cleared cached data");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            tokens: self.tokens.len(),
            employee_data: self.employees.len(),
            db_ids: self.db_ids.read().len(),
            team_data: self.teams.len(),
            attendance_data: self.attendance.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn range() -> DateRange {
        DateRange::single(NaiveDate::from_ymd_opt(2025, 4, 16).unwrap())
    }

    #[test]
    fn entries_expire_after_ttl() {
        let map = TtlMap::new(Duration::from_secs(60));
        map.set("k", 1);
        let now = Instant::now();
        assert_eq!(map.get_at("k", now), Some(1));
        assert_eq!(map.get_at("k", now + Duration::from_secs(61)), None);
        assert!(map.entries.read().is_empty());
    }

    #[test]
    fn stats_skip_expired_entries() {
        let cache = HrCache::with_ttls(
            TOKEN_TTL,
            EMPLOYEE_TTL,
            TEAM_TTL,
            Duration::ZERO,
        );
        cache.set_token("EMP1", "t");
        cache.set_attendance("EMP1", &range(), json!([]));

        let stats = cache.stats();
        assert_eq!(stats.tokens, 1);
        assert_eq!(stats.attendance_data, 0);
        assert!(cache.attendance("EMP1", &range()).is_none());
    }

    #[test]
    fn insert_prunes_expired_keys() {
        let map = TtlMap::new(Duration::ZERO);
        map.set("EMP1_2025-04-01_2025-04-01", 1);
        map.set("EMP1_2025-04-02_2025-04-02", 2);
        assert_eq!(map.entries.read().len(), 1);
    }

    #[test]
    fn employee_caches_db_id() {
        let cache = HrCache::default();
        let employee: Employee = serde_json::from_value(json!({"_id": "db-1"})).unwrap();
        cache.set_employee("EMP1", &employee);
        assert_eq!(cache.db_id("EMP1").as_deref(), Some("db-1"));
        assert!(cache.employee("EMP1").is_some());
    }

    #[test]
    fn clear_employee_removes_related_entries() {
        let cache = HrCache::default();
        cache.set_token("EMP1", "t");
        cache.set_employee("EMP1", &Employee::default());
        cache.set_attendance("EMP1", &range(), json!([]));
        cache.set_attendance("team_EMP1", &range(), json!([]));
        cache.set_attendance("EMP10", &range(), json!([]));

        cache.clear_employee("EMP1");

        let stats = cache.stats();
        assert_eq!(stats.tokens, 0);
        assert_eq!(stats.employee_data, 0);
        assert_eq!(stats.attendance_data, 1);
        assert!(cache.attendance("EMP10", &range()).is_some());
    }
}
