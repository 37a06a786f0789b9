//! Privilege sets, DNF route expressions, and the role map.

use std::collections::HashMap;
use std::fmt;

/// The closed privilege vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    Login,
    ConfigureManager,
    ConfigureUsers,
    ConfigureSelf,
    ConfigureComponents,
    NoAuth,
}

impl Privilege {
    pub const ALL: [Privilege; 6] = [
        Privilege::Login,
        Privilege::ConfigureManager,
        Privilege::ConfigureUsers,
        Privilege::ConfigureSelf,
        Privilege::ConfigureComponents,
        Privilege::NoAuth,
    ];

    fn bit(self) -> u8 {
        match self {
            Privilege::Login => 1 << 0,
            Privilege::ConfigureManager => 1 << 1,
            Privilege::ConfigureUsers => 1 << 2,
            Privilege::ConfigureSelf => 1 << 3,
            Privilege::ConfigureComponents => 1 << 4,
            Privilege::NoAuth => 1 << 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Privilege::Login => "Login",
            Privilege::ConfigureManager => "ConfigureManager",
            Privilege::ConfigureUsers => "ConfigureUsers",
            Privilege::ConfigureSelf => "ConfigureSelf",
            Privilege::ConfigureComponents => "ConfigureComponents",
            Privilege::NoAuth => "NoAuth",
        }
    }

    pub fn parse(name: &str) -> Option<Privilege> {
        Privilege::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

/// A small bit-set over [`Privilege`].
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PrivilegeSet(u8);

impl PrivilegeSet {
    pub const EMPTY: PrivilegeSet = PrivilegeSet(0);

    pub fn from_slice(privileges: &[Privilege]) -> PrivilegeSet {
        let mut set = PrivilegeSet::EMPTY;
        for p in privileges {
            set.insert(*p);
        }
        set
    }

    pub fn insert(&mut self, privilege: Privilege) {
        self.0 |= privilege.bit();
    }

    pub fn remove(&mut self, privilege: Privilege) {
        self.0 &= !privilege.bit();
    }

    pub fn contains(&self, privilege: Privilege) -> bool {
        self.0 & privilege.bit() != 0
    }

    /// True when every privilege in `other` is present in `self`.
    pub fn is_superset_of(&self, other: PrivilegeSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Privilege> + '_ {
        Privilege::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl fmt::Debug for PrivilegeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Privilege::as_str)).finish()
    }
}

/// A required-privilege expression in disjunctive normal form: the request
/// is admitted when any one clause is fully satisfied.
#[derive(Clone, Debug, Default)]
pub struct PrivilegeExpr {
    clauses: Vec<PrivilegeSet>,
}

impl PrivilegeExpr {
    /// A single-clause expression.
    pub fn require(clause: &[Privilege]) -> PrivilegeExpr {
        PrivilegeExpr {
            clauses: vec![PrivilegeSet::from_slice(clause)],
        }
    }

    /// Add an alternative clause.
    pub fn or(mut self, clause: &[Privilege]) -> PrivilegeExpr {
        self.clauses.push(PrivilegeSet::from_slice(clause));
        self
    }

    /// Routes open to anonymous callers.
    pub fn open() -> PrivilegeExpr {
        PrivilegeExpr::require(&[Privilege::NoAuth])
    }

    pub fn clauses(&self) -> &[PrivilegeSet] {
        &self.clauses
    }

    /// Evaluate against the caller's effective privileges.
    ///
    /// `GrantedIfSelf` means some clause would be satisfied if the target
    /// resource belongs to the calling user; the dispatcher resolves the
    /// target username and makes the final call.
    pub fn evaluate(&self, have: PrivilegeSet) -> Admission {
        let no_auth = PrivilegeSet::from_slice(&[Privilege::NoAuth]);
        let mut self_possible = false;
        for clause in &self.clauses {
            if *clause == no_auth {
                return Admission::Granted;
            }
            if have.is_superset_of(*clause) {
                return Admission::Granted;
            }
            if clause.contains(Privilege::ConfigureSelf) {
                let mut rest = *clause;
                rest.remove(Privilege::ConfigureSelf);
                if have.is_superset_of(rest) {
                    self_possible = true;
                }
            }
        }
        if self_possible {
            Admission::GrantedIfSelf
        } else {
            Admission::Denied
        }
    }
}

/// Outcome of evaluating a privilege expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    /// Admit only when the target resource identifies the calling user.
    GrantedIfSelf,
    Denied,
}

/// Role name to privilege-set mapping. Loaded once at startup; read-only
/// afterwards.
#[derive(Clone, Debug)]
pub struct RoleMap {
    inner: HashMap<String, PrivilegeSet>,
}

impl Default for RoleMap {
    fn default() -> Self {
        use Privilege::*;
        let mut inner = HashMap::new();
        inner.insert(
            "Administrator".to_string(),
            PrivilegeSet::from_slice(&[
                Login,
                ConfigureManager,
                ConfigureUsers,
                ConfigureSelf,
                ConfigureComponents,
            ]),
        );
        inner.insert(
            "Operator".to_string(),
            PrivilegeSet::from_slice(&[Login, ConfigureSelf, ConfigureComponents]),
        );
        inner.insert(
            "ReadOnly".to_string(),
            PrivilegeSet::from_slice(&[Login, ConfigureSelf]),
        );
        inner.insert("NoAccess".to_string(), PrivilegeSet::EMPTY);
        RoleMap { inner }
    }
}

impl RoleMap {
    /// Standard roles plus configuration overrides. Unknown privilege names
    /// in the configuration are skipped with a warning.
    pub fn from_config(overrides: &HashMap<String, Vec<String>>) -> RoleMap {
        let mut map = RoleMap::default();
        for (role, names) in overrides {
            let mut set = PrivilegeSet::EMPTY;
            for name in names {
                match Privilege::parse(name) {
                    Some(p) => set.insert(p),
                    None => tracing::warn!(role, privilege = %name, "unknown privilege in role configuration"),
                }
            }
            map.inner.insert(role.clone(), set);
        }
        map
    }

    /// Effective privileges for a role; unknown roles have none.
    pub fn privileges_for(&self, role: &str) -> PrivilegeSet {
        self.inner.get(role).copied().unwrap_or(PrivilegeSet::EMPTY)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Privilege::*;

    #[test]
    fn superset_check() {
        let have = PrivilegeSet::from_slice(&[Login, ConfigureSelf]);
        assert!(have.is_superset_of(PrivilegeSet::from_slice(&[Login])));
        assert!(have.is_superset_of(PrivilegeSet::EMPTY));
        assert!(!have.is_superset_of(PrivilegeSet::from_slice(&[ConfigureUsers])));
    }

    #[test]
    fn no_auth_clause_admits_anonymous() {
        let expr = PrivilegeExpr::open();
        assert_eq!(expr.evaluate(PrivilegeSet::EMPTY), Admission::Granted);
    }

    #[test]
    fn satisfied_clause_admits() {
        let expr = PrivilegeExpr::require(&[Login]);
        let have = PrivilegeSet::from_slice(&[Login, ConfigureSelf]);
        assert_eq!(expr.evaluate(have), Admission::Granted);
        assert_eq!(expr.evaluate(PrivilegeSet::EMPTY), Admission::Denied);
    }

    #[test]
    fn configure_self_falls_back_to_conditional() {
        let expr = PrivilegeExpr::require(&[ConfigureUsers]).or(&[ConfigureSelf]);
        let readonly = RoleMap::default().privileges_for("ReadOnly");
        assert_eq!(expr.evaluate(readonly), Admission::Granted); // ReadOnly holds ConfigureSelf

        let expr = PrivilegeExpr::require(&[ConfigureUsers]).or(&[Login, ConfigureSelf]);
        let noaccess = RoleMap::default().privileges_for("NoAccess");
        assert_eq!(expr.evaluate(noaccess), Admission::Denied);
    }

    #[test]
    fn conditional_self_when_rest_of_clause_held() {
        // Clause {ConfigureSelf} with ConfigureSelf not held: self admission
        // depends on the target, signalled to the dispatcher.
        let expr = PrivilegeExpr::require(&[ConfigureSelf]);
        let have = PrivilegeSet::from_slice(&[Login]);
        assert_eq!(expr.evaluate(have), Admission::GrantedIfSelf);
    }

    #[test]
    fn admission_is_monotonic_in_privileges() {
        let exprs = [
            PrivilegeExpr::require(&[Login]),
            PrivilegeExpr::require(&[ConfigureManager]).or(&[ConfigureUsers]),
            PrivilegeExpr::require(&[Login, ConfigureSelf]),
            PrivilegeExpr::open(),
        ];
        fn rank(a: Admission) -> u8 {
            match a {
                Admission::Denied => 0,
                Admission::GrantedIfSelf => 1,
                Admission::Granted => 2,
            }
        }
        // Enumerate every subset of the vocabulary; adding one privilege must
        // never lower the admission rank.
        for bits in 0u8..64 {
            let mut have = PrivilegeSet::EMPTY;
            for (i, p) in Privilege::ALL.iter().enumerate() {
                if bits & (1 << i) != 0 {
                    have.insert(*p);
                }
            }
            for extra in Privilege::ALL {
                let mut more = have;
                more.insert(extra);
                for expr in &exprs {
                    assert!(
                        rank(expr.evaluate(more)) >= rank(expr.evaluate(have)),
                        "admission regressed adding {extra:?} to {have:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn role_map_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("Operator".to_string(), vec!["Login".to_string()]);
        let map = RoleMap::from_config(&overrides);
        assert_eq!(
            map.privileges_for("Operator"),
            PrivilegeSet::from_slice(&[Login])
        );
        assert!(map
            .privileges_for("Administrator")
            .contains(ConfigureManager));
        assert!(map.privileges_for("DoesNotExist").is_empty());
    }
}
