//! Flow templates and the registry that maps configuration slugs to them.
//!
//! Templates are static configuration loaded once at startup. A flow copies
//! the requirements it needs when it is created, so replacing a template never
//! changes flows that are already running.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gateflow_auth::Role;

use crate::evaluator::CheckpointRequirements;
use crate::officer::{Officer, OfficerAction, OfficerRef};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template slug must not be empty")]
    EmptySlug,

    #[error("template '{0}' has no checkpoints")]
    NoCheckpoints(String),

    #[error("template '{slug}' declares checkpoint order {order} more than once")]
    DuplicateOrder { slug: String, order: u32 },

    #[error("template '{slug}' checkpoint {order} has no officers")]
    NoOfficers { slug: String, order: u32 },

    #[error("template '{slug}' checkpoint {order} has no must-sign officer and a quorum of 0, so it would complete unsigned")]
    VacuousCheckpoint { slug: String, order: u32 },

    #[error("template '{slug}' checkpoint {order} needs {required} signatures but only {available} can-sign users exist")]
    UnreachableQuorum {
        slug: String,
        order: u32,
        required: u32,
        available: u32,
    },

    #[error("duplicate template slug '{0}'")]
    DuplicateSlug(String),

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template document is not valid JSON: {0}")]
    Parse(String),
}

/// One gate of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointTemplate {
    pub title: String,
    pub order: u32,
    pub officers: Vec<Officer>,
    /// Overrides the template-wide quorum for this checkpoint.
    #[serde(default)]
    pub min_signatures: Option<u32>,
    /// Accepts signatures even while an earlier checkpoint is still open.
    #[serde(default)]
    pub open_for_signing: bool,
}

/// Immutable approval configuration for one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTemplate {
    pub config_slug: String,
    /// Document type the template gates (e.g. "purchase_order").
    pub object_type: String,
    pub checkpoints: Vec<CheckpointTemplate>,
    /// Default quorum inherited by checkpoints without an override.
    #[serde(default)]
    pub min_signatures: u32,
    /// Officers required at every checkpoint of the template.
    #[serde(default)]
    pub must_sign_officers: Vec<Officer>,
}

impl FlowTemplate {
    /// Checkpoints sorted by `order`.
    pub fn ordered_checkpoints(&self) -> Vec<&CheckpointTemplate> {
        let mut cps: Vec<&CheckpointTemplate> = self.checkpoints.iter().collect();
        cps.sort_by_key(|c| c.order);
        cps
    }

    /// Effective requirements of a checkpoint: template-wide must-sign
    /// officers plus the checkpoint's own officers split by action.
    pub fn requirements_for(&self, checkpoint: &CheckpointTemplate) -> CheckpointRequirements {
        let mut must_sign_officers: Vec<Officer> = self
            .must_sign_officers
            .iter()
            .cloned()
            .map(|o| o.with_action(OfficerAction::MustSign))
            .collect();
        let mut can_sign_officers = Vec::new();

        for officer in &checkpoint.officers {
            match officer.action {
                OfficerAction::MustSign => must_sign_officers.push(officer.clone()),
                OfficerAction::CanSign => can_sign_officers.push(officer.clone()),
            }
        }

        CheckpointRequirements {
            must_sign_officers,
            can_sign_officers,
            min_signatures: checkpoint.min_signatures.unwrap_or(self.min_signatures),
        }
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        let slug = self.config_slug.trim();
        if slug.is_empty() {
            return Err(TemplateError::EmptySlug);
        }
        if self.checkpoints.is_empty() {
            return Err(TemplateError::NoCheckpoints(slug.to_string()));
        }

        let mut seen = HashSet::new();
        for cp in &self.checkpoints {
            if !seen.insert(cp.order) {
                return Err(TemplateError::DuplicateOrder {
                    slug: slug.to_string(),
                    order: cp.order,
                });
            }

            let req = self.requirements_for(cp);
            if req.must_sign_officers.is_empty() && req.can_sign_officers.is_empty() {
                return Err(TemplateError::NoOfficers {
                    slug: slug.to_string(),
                    order: cp.order,
                });
            }

            if req.must_sign_officers.is_empty() && req.min_signatures == 0 {
                return Err(TemplateError::VacuousCheckpoint {
                    slug: slug.to_string(),
                    order: cp.order,
                });
            }

            // Role entries can be held by any number of users; only an
            // all-user can-sign list has a known upper bound.
            let all_users = req
                .can_sign_officers
                .iter()
                .all(|o| matches!(o.subject, OfficerRef::User(_)));
            let available = req.can_sign_officers.len() as u32;
            if all_users && req.min_signatures > available {
                return Err(TemplateError::UnreachableQuorum {
                    slug: slug.to_string(),
                    order: cp.order,
                    required: req.min_signatures,
                    available,
                });
            }
        }

        Ok(())
    }
}

/// Slug → template lookup, validated on construction.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, FlowTemplate>,
}

impl TemplateRegistry {
    pub fn from_templates(templates: Vec<FlowTemplate>) -> Result<Self, TemplateError> {
        let mut map = BTreeMap::new();
        for t in templates {
            t.validate()?;
            let slug = t.config_slug.trim().to_string();
            if map.contains_key(&slug) {
                return Err(TemplateError::DuplicateSlug(slug));
            }
            map.insert(slug, t);
        }
        Ok(Self { templates: map })
    }

    /// Parse a JSON array of templates.
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let templates: Vec<FlowTemplate> =
            serde_json::from_str(json).map_err(|e| TemplateError::Parse(e.to_string()))?;
        Self::from_templates(templates)
    }

    pub fn get(&self, slug: &str) -> Option<&FlowTemplate> {
        self.templates.get(slug)
    }

    pub fn require(&self, slug: &str) -> Result<&FlowTemplate, TemplateError> {
        self.get(slug)
            .ok_or_else(|| TemplateError::UnknownTemplate(slug.to_string()))
    }

    pub fn list(&self) -> impl Iterator<Item = &FlowTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Built-in configuration for the stock document types.
    pub fn builtin() -> Self {
        let templates = builtin_templates();
        // The built-in set is covered by tests; an invalid entry is a bug.
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.config_slug.clone(), t))
                .collect(),
        }
    }
}

fn role_officer(role: &'static str, display: &str, action: OfficerAction) -> Officer {
    Officer::role(Role::new(role), display, action)
}

fn builtin_templates() -> Vec<FlowTemplate> {
    vec![
        // Purchase orders pass the A/B/C pattern.
        FlowTemplate {
            config_slug: "purchase_order".to_string(),
            object_type: "purchase_order".to_string(),
            min_signatures: 0,
            must_sign_officers: vec![],
            checkpoints: vec![
                CheckpointTemplate {
                    title: "Punctul A".to_string(),
                    order: 1,
                    officers: vec![
                        role_officer("economist", "Economist", OfficerAction::CanSign),
                        role_officer("procurement", "Procurement officer", OfficerAction::CanSign),
                    ],
                    min_signatures: Some(1),
                    open_for_signing: false,
                },
                CheckpointTemplate {
                    title: "Punctul B".to_string(),
                    order: 2,
                    officers: vec![role_officer(
                        "cfp",
                        "Preventive financial control",
                        OfficerAction::MustSign,
                    )],
                    min_signatures: None,
                    open_for_signing: false,
                },
                CheckpointTemplate {
                    title: "Punctul C".to_string(),
                    order: 3,
                    officers: vec![role_officer("director", "Director", OfficerAction::MustSign)],
                    min_signatures: None,
                    open_for_signing: false,
                },
            ],
        },
        FlowTemplate {
            config_slug: "requisition".to_string(),
            object_type: "requisition".to_string(),
            min_signatures: 0,
            must_sign_officers: vec![],
            checkpoints: vec![CheckpointTemplate {
                title: "Head of department".to_string(),
                order: 1,
                officers: vec![role_officer(
                    "department_head",
                    "Head of department",
                    OfficerAction::MustSign,
                )],
                min_signatures: None,
                open_for_signing: false,
            }],
        },
        FlowTemplate {
            config_slug: "fundamentare_note".to_string(),
            object_type: "fundamentare_note".to_string(),
            min_signatures: 0,
            must_sign_officers: vec![],
            checkpoints: vec![
                CheckpointTemplate {
                    title: "Initiator".to_string(),
                    order: 1,
                    officers: vec![role_officer(
                        "department_head",
                        "Head of department",
                        OfficerAction::MustSign,
                    )],
                    min_signatures: None,
                    open_for_signing: false,
                },
                CheckpointTemplate {
                    title: "Approval".to_string(),
                    order: 2,
                    officers: vec![
                        role_officer("director", "Director", OfficerAction::MustSign),
                        role_officer("economist", "Economist", OfficerAction::CanSign),
                        role_officer("legal", "Legal advisor", OfficerAction::CanSign),
                    ],
                    min_signatures: Some(1),
                    open_for_signing: false,
                },
            ],
        },
        // Received-stock batches are signed by a reception committee.
        FlowTemplate {
            config_slug: "received_stock_batch".to_string(),
            object_type: "received_stock_batch".to_string(),
            min_signatures: 2,
            must_sign_officers: vec![],
            checkpoints: vec![CheckpointTemplate {
                title: "Reception committee".to_string(),
                order: 1,
                officers: vec![
                    role_officer("storekeeper", "Storekeeper", OfficerAction::MustSign),
                    role_officer(
                        "reception_committee",
                        "Reception committee member",
                        OfficerAction::CanSign,
                    ),
                ],
                min_signatures: None,
                open_for_signing: false,
            }],
        },
    ]
}
