use std::path::Path;

use rust_decimal::Decimal;
use staffquote_core::{
    ApprovalRoute, ApprovalRouter, ApproverRoleCache, DiscountType, InMemoryRoleDirectory,
    ResolvedRoute,
};

use crate::catalog::load_catalog;
use crate::commands::{load_config, CommandResult};

pub fn run(catalog_path: &Path, percent: Decimal, discount_type: DiscountType) -> CommandResult {
    let config = match load_config("approver") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let catalog = match load_catalog(catalog_path, config.pricing.ingestion_mode) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::from_error("approver", &error),
    };

    let router = ApprovalRouter::from_config(&config.approvals);
    let resolved = if catalog.approver_roles.is_empty() {
        ResolvedRoute {
            route: router.route(percent, discount_type, &catalog.discount_approvals),
            approver: None,
        }
    } else {
        let directory = InMemoryRoleDirectory::new(catalog.approver_roles);
        let mut cache = ApproverRoleCache::new();
        match router.route_with_role(
            percent,
            discount_type,
            &catalog.discount_approvals,
            &directory,
            &mut cache,
        ) {
            Ok(resolved) => resolved,
            Err(error) => return CommandResult::from_error("approver", &error),
        }
    };

    let subject = format!("{percent}% {} discount", discount_type.as_str());
    let message = match &resolved.route {
        ApprovalRoute::NotRequired => format!("{subject} needs no approval"),
        ApprovalRoute::Required { role_id } => {
            let name = resolved.approver.as_ref().map(|role| role.name.as_str());
            match name {
                Some(name) => format!("{subject} needs approval from {name} (`{}`)", role_id.0),
                None => format!("{subject} needs approval from `{}`", role_id.0),
            }
        }
        ApprovalRoute::Uncovered { escalate_to: Some(role_id) } => {
            format!("{subject} is outside the approval matrix; escalating to `{}`", role_id.0)
        }
        ApprovalRoute::Uncovered { escalate_to: None } => {
            format!("{subject} is outside the approval matrix and has no approver")
        }
    };

    CommandResult::success_with_data("approver", message, &resolved)
}
