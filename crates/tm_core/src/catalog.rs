//! Skill and boss-phase configuration.
//!
//! Skills are defined once here and referenced from units by id, the same
//! way the server keeps its config out of the database: a built-in default
//! table plus JSON loading for game-mode overrides.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::models::{DamageType, EffectKind, EffectSpec, ModifierOp};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceCost {
    #[serde(default)]
    pub mp: f64,
    #[serde(default)]
    pub hp: f64,
    #[serde(default)]
    pub stamina: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    /// Rounds before the skill is available again after use.
    pub cooldown: u32,
    #[serde(default)]
    pub resource_cost: ResourceCost,
    pub effects: Vec<EffectSpec>,
    /// Maximum cast range in hexes.
    #[serde(default = "default_range")]
    pub range: u32,
}

fn default_range() -> u32 {
    1
}

/// Lookup table for skill metadata, consulted by precondition checks and
/// by the executor's resolution routines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillCatalog {
    skills: HashMap<String, Skill>,
}

impl SkillCatalog {
    pub fn new(skills: Vec<Skill>) -> Result<Self, CatalogError> {
        let mut map = HashMap::with_capacity(skills.len());
        for skill in skills {
            if map.contains_key(&skill.id) {
                return Err(CatalogError::DuplicateSkill(skill.id));
            }
            map.insert(skill.id.clone(), skill);
        }
        Ok(Self { skills: map })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let skills: Vec<Skill> = serde_json::from_str(json)?;
        Self::new(skills)
    }

    /// The built-in skill table.
    pub fn builtin() -> Self {
        BUILTIN_CATALOG.clone()
    }

    pub fn get(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.get(skill_id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// One weighted entry in a phase's skill rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPriority {
    pub skill_id: String,
    pub priority: f64,
}

/// A boss behavior phase, active while the boss hp ratio is at or below
/// its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossPhase {
    pub name: String,
    /// Hp fraction at which the phase becomes reachable (1.0 = full hp).
    pub hp_threshold: f64,
    pub skill_priorities: Vec<SkillPriority>,
}

/// Phase table for a boss. Phases are ordered from opening phase to final
/// phase; the deepest phase whose threshold has been reached is active.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BossPhaseConfig {
    pub phases: Vec<BossPhase>,
}

impl BossPhaseConfig {
    pub fn new(phases: Vec<BossPhase>) -> Self {
        Self { phases }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let phases: Vec<BossPhase> = serde_json::from_str(json)?;
        Ok(Self { phases })
    }

    /// Selects the active phase for the given hp ratio.
    pub fn phase_for_hp(&self, hp_ratio: f64) -> Option<&BossPhase> {
        self.phases.iter().rev().find(|p| hp_ratio <= p.hp_threshold).or_else(|| self.phases.first())
    }
}

fn damage_effect(id: &str, name: &str, value: f64, damage_type: DamageType) -> EffectSpec {
    EffectSpec {
        id: id.to_string(),
        name: name.to_string(),
        kind: EffectKind::Damage,
        value,
        duration: 0,
        damage_type: Some(damage_type),
        modifiers: BTreeMap::new(),
        modifier_op: ModifierOp::Add,
        falloff: None,
    }
}

static BUILTIN_CATALOG: Lazy<SkillCatalog> = Lazy::new(|| {
    let skills = vec![
        Skill {
            id: "skill_flame_breath".to_string(),
            name: "Flame Breath".to_string(),
            cooldown: 3,
            resource_cost: ResourceCost { mp: 20.0, ..Default::default() },
            effects: vec![EffectSpec {
                falloff: Some(crate::models::DamageFalloff {
                    full_damage_range: 2,
                    min_damage_percent: 0.6,
                }),
                ..damage_effect("eff_flame", "Flame", 40.0, DamageType::Magical)
            }],
            range: 3,
        },
        Skill {
            id: "skill_crush".to_string(),
            name: "Crush".to_string(),
            cooldown: 2,
            resource_cost: ResourceCost::default(),
            effects: vec![damage_effect("eff_crush", "Crush", 25.0, DamageType::Physical)],
            range: 1,
        },
        Skill {
            id: "skill_venom_spit".to_string(),
            name: "Venom Spit".to_string(),
            cooldown: 4,
            resource_cost: ResourceCost { mp: 10.0, ..Default::default() },
            effects: vec![EffectSpec {
                id: "eff_venom".to_string(),
                name: "Venom".to_string(),
                kind: EffectKind::DamageOverTime,
                value: 8.0,
                duration: 3,
                damage_type: None,
                modifiers: BTreeMap::new(),
                modifier_op: ModifierOp::Add,
                falloff: None,
            }],
            range: 2,
        },
        Skill {
            id: "skill_harden".to_string(),
            name: "Harden".to_string(),
            cooldown: 5,
            resource_cost: ResourceCost::default(),
            effects: vec![EffectSpec {
                id: "eff_harden".to_string(),
                name: "Harden".to_string(),
                kind: EffectKind::Buff,
                value: 0.0,
                duration: 2,
                damage_type: None,
                modifiers: BTreeMap::from([("defense".to_string(), 10.0)]),
                modifier_op: ModifierOp::Add,
                falloff: None,
            }],
            range: 0,
        },
        Skill {
            id: "skill_roar".to_string(),
            name: "Terrifying Roar".to_string(),
            cooldown: 4,
            resource_cost: ResourceCost { stamina: 5.0, ..Default::default() },
            effects: vec![EffectSpec {
                id: "eff_roar".to_string(),
                name: "Terrified".to_string(),
                kind: EffectKind::Debuff,
                value: 0.0,
                duration: 2,
                damage_type: None,
                modifiers: BTreeMap::from([("attack".to_string(), 5.0)]),
                modifier_op: ModifierOp::Add,
                falloff: None,
            }],
            range: 2,
        },
    ];
    SkillCatalog::new(skills).expect("builtin catalog has unique ids")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_lookup() {
        let catalog = SkillCatalog::builtin();
        assert!(catalog.len() >= 5);
        let skill = catalog.get("skill_flame_breath").expect("builtin skill");
        assert_eq!(skill.cooldown, 3);
        assert_eq!(skill.resource_cost.mp, 20.0);
        assert!(catalog.get("skill_nonexistent").is_none());
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"[
            {
                "id": "skill_test",
                "name": "Test",
                "cooldown": 1,
                "resource_cost": { "mp": 5.0 },
                "effects": [
                    { "id": "e", "name": "E", "kind": "damage", "value": 10.0,
                      "damage_type": "physical" }
                ]
            }
        ]"#;
        let catalog = SkillCatalog::from_json(json).unwrap();
        let skill = catalog.get("skill_test").unwrap();
        assert_eq!(skill.range, 1, "range should default");
        assert_eq!(skill.effects[0].kind, EffectKind::Damage);
    }

    #[test]
    fn test_duplicate_skill_rejected() {
        let skill = SkillCatalog::builtin().get("skill_crush").unwrap().clone();
        let result = SkillCatalog::new(vec![skill.clone(), skill]);
        assert!(matches!(result, Err(CatalogError::DuplicateSkill(_))));
    }

    #[test]
    fn test_phase_selection_by_hp_ratio() {
        let config = BossPhaseConfig::new(vec![
            BossPhase {
                name: "phase1".to_string(),
                hp_threshold: 1.0,
                skill_priorities: vec![],
            },
            BossPhase {
                name: "phase2".to_string(),
                hp_threshold: 0.6,
                skill_priorities: vec![],
            },
            BossPhase {
                name: "phase3".to_string(),
                hp_threshold: 0.25,
                skill_priorities: vec![],
            },
        ]);

        assert_eq!(config.phase_for_hp(0.9).unwrap().name, "phase1");
        assert_eq!(config.phase_for_hp(0.6).unwrap().name, "phase2");
        assert_eq!(config.phase_for_hp(0.1).unwrap().name, "phase3");
    }

    #[test]
    fn test_empty_phase_config_has_no_phase() {
        assert!(BossPhaseConfig::default().phase_for_hp(0.5).is_none());
    }
}
