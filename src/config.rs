use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agreement::DistanceKind;
use crate::model::FieldName;

/// Process-wide configuration: the harm taxonomy offered to raters and the
/// defaults of the agreement report. Built once in `main` and only ever
/// handed out by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "Taxonomy::builtin")]
    pub taxonomy: Taxonomy,
    #[serde(default)]
    pub agreement: AgreementDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    pub stakeholders: Vec<StakeholderDefinition>,
    pub harm_categories: Vec<HarmCategory>,
    pub harm_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeholderDefinition {
    pub name: String,
    #[serde(default)]
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementDefaults {
    pub fields: Vec<FieldName>,
    pub distance: DistanceKind,
}

impl Default for AgreementDefaults {
    fn default() -> Self {
        Self {
            fields: vec![FieldName::Stakeholder, FieldName::HarmSubcategory],
            distance: DistanceKind::Jaccard,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            taxonomy: Taxonomy::builtin(),
            agreement: AgreementDefaults::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                let config: AppConfig = serde_json::from_slice(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?;
                info!(path = %path.display(), "loaded configuration");
                config
            }
            None => AppConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agreement.fields.is_empty() {
            bail!("configuration must name at least one agreement field");
        }

        let mut stakeholders = HashSet::new();
        for stakeholder in &self.taxonomy.stakeholders {
            if stakeholder.name.trim().is_empty() {
                bail!("stakeholder names must not be empty");
            }
            if !stakeholders.insert(stakeholder.name.as_str()) {
                bail!("duplicate stakeholder in taxonomy: {}", stakeholder.name);
            }
        }

        let mut categories = HashSet::new();
        for category in &self.taxonomy.harm_categories {
            if category.name.trim().is_empty() {
                bail!("harm category names must not be empty");
            }
            if !categories.insert(category.name.as_str()) {
                bail!("duplicate harm category in taxonomy: {}", category.name);
            }
            if category
                .subcategories
                .iter()
                .any(|subcategory| subcategory.trim().is_empty())
            {
                bail!("harm category {} has an empty subcategory", category.name);
            }
        }

        if self.taxonomy.harm_types.is_empty() {
            bail!("taxonomy must define at least one harm type");
        }

        Ok(())
    }
}

impl Taxonomy {
    pub fn is_stakeholder(&self, name: &str) -> bool {
        self.stakeholders.iter().any(|entry| entry.name == name)
    }

    pub fn category(&self, name: &str) -> Option<&HarmCategory> {
        self.harm_categories.iter().find(|entry| entry.name == name)
    }

    pub fn is_harm_type(&self, name: &str) -> bool {
        self.harm_types.iter().any(|entry| entry == name)
    }

    pub fn builtin() -> Self {
        let stakeholders = [
            (
                "Users",
                "Individuals or entities directly interacting with a system, or those being directly targeted by it, such as citizens, consumers, patients, students, employees, delivery drivers, job applicants, travellers, immigrants",
            ),
            (
                "General public",
                "Individuals indirectly impacted by a system, such as passers-by, local communities and other members of the general public",
            ),
            (
                "Vulnerable groups",
                "Including women, children, disabled people, ethnic and religious minorities",
            ),
            (
                "Workers",
                "Third-party contractors and others tasked with training, managing or optimising data or information systems",
            ),
            (
                "Artists/content creators",
                "People inventing, producing or making creative and/or IP/copyright-protected products, services, or content",
            ),
            (
                "Government/public sector",
                "Including politicians, civil servants, and regulators",
            ),
            (
                "Business",
                "Competitors, industry, and other commercial entities that are not developers or deployers of a system",
            ),
            (
                "Investors",
                "Shareholders/investors in the developer and/or deployer",
            ),
        ];

        let categories: [(&str, &str, &[&str]); 10] = [
            (
                "Autonomy",
                "Loss of or restrictions to the ability or rights of an individual, group or entity to make decisions and control their identity",
                &[
                    "Autonomy/agency loss",
                    "Impersonation/identity theft",
                    "IP/copyright loss",
                    "Personality loss",
                ],
            ),
            (
                "Physical",
                "Physical injury to an individual or group, or damage to physical property",
                &[
                    "Bodily injury",
                    "Loss of life",
                    "Personal health deterioration",
                    "Property damage",
                ],
            ),
            (
                "Emotional & psychological",
                "Direct or indirect impairment of the emotional and psychological mental health of an individual, organisation, or society",
                &[
                    "Addiction",
                    "Alienation/isolation",
                    "Anxiety/distress/depression",
                    "Coercion/manipulation",
                    "Dehumanisation/objectification",
                    "Dignity loss",
                    "Divination/fetishisation",
                    "Intimidation",
                    "Over-reliance",
                    "Radicalisation",
                    "Self-harm",
                    "Sexualisation",
                ],
            ),
            (
                "Reputational",
                "Damage to the reputation of an individual, group or organisation",
                &["Defamation/libel/slander", "Loss of confidence/trust"],
            ),
            (
                "Financial & business",
                "Use or misuse of a technology system in a manner that damages the financial interests of an individual or group, or which causes strategic, operational, legal or financial harm to a business or other organisation",
                &[
                    "Business operations/infrastructure damage",
                    "Confidentiality loss",
                    "Competition/collusion",
                    "Financial/earnings loss",
                    "Livelihood loss",
                    "Loss of productivity",
                    "Opportunity loss",
                ],
            ),
            (
                "Human rights & civil liberties",
                "Use or misuse of a technology system in a manner that compromises fundamental human rights and freedoms",
                &[
                    "Loss of human rights and freedoms",
                    "Benefits/entitlements loss",
                    "Discrimination",
                    "Privacy loss",
                ],
            ),
            (
                "Societal & cultural",
                "Harms affecting the functioning of societies, communities and economies caused directly or indirectly by the use or misuse technology systems",
                &[
                    "Damage to public health",
                    "Information ecosystem degradation",
                    "Job loss/losses",
                    "Labour exploitation",
                    "Loss of creativity/critical thinking",
                    "Stereotyping",
                    "Public service delivery deterioration",
                    "Societal destabilisation",
                    "Societal inequality",
                    "Violence/armed conflict",
                ],
            ),
            (
                "Political & economic",
                "Manipulation of political beliefs, damage to political institutions and the effective delivery of government services",
                &[
                    "Critical infrastructure damage",
                    "Economic/political power concentration",
                    "Economic instability",
                    "Electoral interference",
                    "Institutional trust loss",
                    "Political instability",
                    "Political manipulation",
                ],
            ),
            (
                "Environmental",
                "Damage to the environment directly or indirectly caused by a technology system or set of systems",
                &[
                    "Carbon emissions",
                    "Ecology/biodiversity loss",
                    "Energy consumption",
                    "Natural resources extraction",
                    "Electronic waste",
                    "Landfill",
                    "Pollution",
                    "Water consumption",
                ],
            ),
            ("Other", "", &["Cheating/plagiarism"]),
        ];

        Self {
            stakeholders: stakeholders
                .iter()
                .map(|(name, definition)| StakeholderDefinition {
                    name: (*name).to_string(),
                    definition: (*definition).to_string(),
                })
                .collect(),
            harm_categories: categories
                .iter()
                .map(|(name, description, subcategories)| HarmCategory {
                    name: (*name).to_string(),
                    description: (*description).to_string(),
                    subcategories: subcategories.iter().map(|value| value.to_string()).collect(),
                })
                .collect(),
            harm_types: vec!["Actual".to_string(), "Potential".to_string()],
        }
    }
}
