pub mod cache;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::config::{ApprovalsConfig, UncoveredPolicy};
use crate::domain::approval::{ApproverRole, DiscountApprovalRule, DiscountType, RoleId};
use crate::errors::ApplicationError;

use self::cache::{ApproverRoleCache, RoleDirectory};

/// Finds the role that must sign off a discount, if any rule covers it.
///
/// Only active rules of `discount_type` are considered, highest priority first
/// (ties keep input order). A rule covers `(min_percentage, max_percentage]`.
/// `None` is returned both for a non-positive discount and for a discount no
/// range covers; use [`ApprovalRouter`] to tell the two apart.
pub fn resolve_approver(
    discount_pct: Decimal,
    discount_type: DiscountType,
    rules: &[DiscountApprovalRule],
) -> Option<RoleId> {
    if discount_pct <= Decimal::ZERO {
        return None;
    }

    let mut candidates: Vec<&DiscountApprovalRule> = rules
        .iter()
        .filter(|rule| rule.is_active && rule.discount_type == discount_type)
        .collect();
    candidates.sort_by(|left, right| right.priority.cmp(&left.priority));

    candidates
        .into_iter()
        .find(|rule| rule.covers(discount_pct))
        .map(|rule| rule.approver_role_id.clone())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApprovalRoute {
    /// No discount, or the discount sits at or below the lowest configured range.
    NotRequired,
    Required { role_id: RoleId },
    /// Positive discount that no active range covers.
    Uncovered { escalate_to: Option<RoleId> },
}

impl ApprovalRoute {
    pub fn role_id(&self) -> Option<&RoleId> {
        match self {
            Self::NotRequired => None,
            Self::Required { role_id } => Some(role_id),
            Self::Uncovered { escalate_to } => escalate_to.as_ref(),
        }
    }

    pub fn needs_attention(&self) -> bool {
        !matches!(self, Self::NotRequired)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    pub route: ApprovalRoute,
    pub approver: Option<ApproverRole>,
}

#[derive(Clone, Debug, Default)]
pub struct ApprovalRouter {
    uncovered_policy: UncoveredPolicy,
    escalation_role: Option<RoleId>,
}

impl ApprovalRouter {
    pub fn new(uncovered_policy: UncoveredPolicy, escalation_role: Option<RoleId>) -> Self {
        Self { uncovered_policy, escalation_role }
    }

    pub fn from_config(config: &ApprovalsConfig) -> Self {
        Self::new(config.uncovered_policy, config.escalation_role.clone().map(RoleId))
    }

    pub fn route(
        &self,
        discount_pct: Decimal,
        discount_type: DiscountType,
        rules: &[DiscountApprovalRule],
    ) -> ApprovalRoute {
        let route = self.classify(discount_pct, discount_type, rules);
        debug!(
            event_name = "approvals.route.resolved",
            discount_type = discount_type.as_str(),
            discount_pct = %discount_pct,
            route = ?route,
            "discount approval route resolved"
        );
        route
    }

    /// Routes and looks up the approver role through the caller's cache.
    pub fn route_with_role(
        &self,
        discount_pct: Decimal,
        discount_type: DiscountType,
        rules: &[DiscountApprovalRule],
        directory: &dyn RoleDirectory,
        cache: &mut ApproverRoleCache,
    ) -> Result<ResolvedRoute, ApplicationError> {
        let route = self.route(discount_pct, discount_type, rules);
        let approver = match route.role_id() {
            Some(role_id) => Some(cache.get_or_load(role_id, directory)?.ok_or_else(|| {
                ApplicationError::Catalog(format!("approver role `{}` is not defined", role_id.0))
            })?),
            None => None,
        };

        Ok(ResolvedRoute { route, approver })
    }

    fn classify(
        &self,
        discount_pct: Decimal,
        discount_type: DiscountType,
        rules: &[DiscountApprovalRule],
    ) -> ApprovalRoute {
        if discount_pct <= Decimal::ZERO {
            return ApprovalRoute::NotRequired;
        }

        if let Some(role_id) = resolve_approver(discount_pct, discount_type, rules) {
            return ApprovalRoute::Required { role_id };
        }

        let floor = rules
            .iter()
            .filter(|rule| rule.is_active && rule.discount_type == discount_type)
            .map(|rule| rule.min_percentage)
            .min();

        match floor {
            None => ApprovalRoute::NotRequired,
            Some(floor) if discount_pct <= floor => ApprovalRoute::NotRequired,
            Some(_) => ApprovalRoute::Uncovered {
                escalate_to: match self.uncovered_policy {
                    UncoveredPolicy::Unrouted => None,
                    UncoveredPolicy::Escalate => self.escalation_role.clone(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        cache::{ApproverRoleCache, InMemoryRoleDirectory},
        resolve_approver, ApprovalRoute, ApprovalRouter,
    };
    use crate::config::UncoveredPolicy;
    use crate::domain::approval::{ApproverRole, DiscountApprovalRule, DiscountType, RoleId};
    use crate::errors::ApplicationError;

    fn rule(min: i64, max: i64, role: &str) -> DiscountApprovalRule {
        DiscountApprovalRule {
            discount_type: DiscountType::LineItem,
            min_percentage: Decimal::from(min),
            max_percentage: Decimal::from(max),
            approver_role_id: RoleId(role.to_string()),
            priority: 0,
            is_active: true,
        }
    }

    fn matrix() -> Vec<DiscountApprovalRule> {
        vec![rule(0, 10, "R1"), rule(10, 25, "R2")]
    }

    fn pct(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn role(id: &str) -> Option<RoleId> {
        Some(RoleId(id.to_string()))
    }

    #[test]
    fn ranges_exclude_lower_and_include_upper_bound() {
        let rules = matrix();

        assert_eq!(resolve_approver(pct(10), DiscountType::LineItem, &rules), role("R1"));
        assert_eq!(resolve_approver(Decimal::new(1001, 2), DiscountType::LineItem, &rules), role("R2"));
        assert_eq!(resolve_approver(pct(25), DiscountType::LineItem, &rules), role("R2"));
    }

    #[test]
    fn non_positive_and_uncovered_discounts_resolve_to_none() {
        let rules = matrix();

        assert_eq!(resolve_approver(pct(0), DiscountType::LineItem, &rules), None);
        assert_eq!(resolve_approver(pct(-5), DiscountType::LineItem, &rules), None);
        assert_eq!(resolve_approver(pct(30), DiscountType::LineItem, &rules), None);
    }

    #[test]
    fn inactive_and_other_type_rules_are_ignored() {
        let mut inactive = rule(0, 50, "R-inactive");
        inactive.is_active = false;
        let mut overall = rule(0, 50, "R-overall");
        overall.discount_type = DiscountType::OverallQuote;

        let rules = vec![inactive, overall];

        assert_eq!(resolve_approver(pct(5), DiscountType::LineItem, &rules), None);
        assert_eq!(resolve_approver(pct(5), DiscountType::OverallQuote, &rules), role("R-overall"));
    }

    #[test]
    fn higher_priority_wins_and_ties_keep_input_order() {
        let mut specialist = rule(0, 20, "R-specialist");
        specialist.priority = 10;
        let rules = vec![rule(0, 20, "R-first"), rule(0, 20, "R-second"), specialist];

        assert_eq!(resolve_approver(pct(5), DiscountType::LineItem, &rules), role("R-specialist"));
        assert_eq!(resolve_approver(pct(5), DiscountType::LineItem, &rules[..2]), role("R-first"));
    }

    #[test]
    fn router_separates_small_discounts_from_uncovered_ones() {
        let router = ApprovalRouter::default();
        let rules = vec![rule(5, 10, "R1"), rule(10, 25, "R2")];

        assert_eq!(router.route(pct(0), DiscountType::LineItem, &rules), ApprovalRoute::NotRequired);
        assert_eq!(router.route(pct(3), DiscountType::LineItem, &rules), ApprovalRoute::NotRequired);
        assert_eq!(
            router.route(pct(12), DiscountType::LineItem, &rules),
            ApprovalRoute::Required { role_id: RoleId("R2".to_string()) }
        );
        assert_eq!(
            router.route(pct(40), DiscountType::LineItem, &rules),
            ApprovalRoute::Uncovered { escalate_to: None }
        );
        assert_eq!(router.route(pct(40), DiscountType::OverallQuote, &rules), ApprovalRoute::NotRequired);
    }

    #[test]
    fn escalate_policy_routes_uncovered_discounts_to_configured_role() {
        let router = ApprovalRouter::new(UncoveredPolicy::Escalate, role("role-cfo"));

        let route = router.route(pct(40), DiscountType::LineItem, &matrix());

        assert_eq!(route, ApprovalRoute::Uncovered { escalate_to: role("role-cfo") });
        assert_eq!(route.role_id(), Some(&RoleId("role-cfo".to_string())));
        assert!(route.needs_attention());
    }

    #[test]
    fn route_with_role_uses_the_callers_cache() {
        let router = ApprovalRouter::default();
        let directory = InMemoryRoleDirectory::new(vec![ApproverRole {
            id: RoleId("R2".to_string()),
            name: "Regional Director".to_string(),
            description: None,
        }]);
        let mut cache = ApproverRoleCache::new();

        let resolved = router
            .route_with_role(pct(20), DiscountType::LineItem, &matrix(), &directory, &mut cache)
            .expect("role resolves");
        assert_eq!(resolved.approver.map(|role| role.name), Some("Regional Director".to_string()));
        assert_eq!(cache.len(), 1);

        let missing = router.route_with_role(pct(5), DiscountType::LineItem, &matrix(), &directory, &mut cache);
        assert!(matches!(missing, Err(ApplicationError::Catalog(_))));

        let none = router
            .route_with_role(pct(0), DiscountType::LineItem, &matrix(), &directory, &mut cache)
            .expect("no lookup needed");
        assert_eq!(none.approver, None);
    }
}
