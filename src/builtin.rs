//! Built-in rule table
//!
//! The mod families this tool knows about. The literal replacement files live
//! in the patch-data tree under each rule's name; only paths and small field
//! values are spelled out here.

use crate::dispatch::Predicate;
use crate::filter::FilterSpec;
use crate::rules::{Action, Plan, Rule, Step};
use serde_json::json;

fn overwrite(source: &str, target: &str) -> Step {
    Step::best_effort(Action::Overwrite {
        source: source.into(),
        target: target.into(),
    })
}

fn contains(text: &str) -> Predicate {
    Predicate::Contains { text: text.into() }
}

fn prefix(text: &str) -> Predicate {
    Predicate::Prefix { text: text.into() }
}

fn workspace(steps: Vec<Step>) -> Plan {
    Plan::Workspace {
        filter: FilterSpec::passthrough(),
        steps,
    }
}

fn ymmersive_melodies() -> Rule {
    Rule::new(
        "ymmersive_melodies",
        "Found ymmersive-melodies mod -> Swapping default songs",
        Plan::SwapResourceDir {
            prefix: "Server/YmmersiveMelodies/".into(),
            source: None,
        },
    )
}

fn snip3s_foodpack() -> Rule {
    const ICONS: &str = "Common/Icons/ItemsGenerated/";
    const ITEMS: &str = "Server/Item/Items/";
    const FOOD: &str = "Common/Items/Consumables/Food/";
    const EFFECTS: &str = "Server/Entity/Effects/";
    const INTERACTIONS: &str = "Server/Item/Interactions/";

    let groups: [(&str, &[&str]); 5] = [
        (
            ICONS,
            &[
                "Food_Fried_Potato.png",
                "Food_Pasta.png",
                "Food_Pizza_Cheese.png",
                "Food_Raw_Pasta.png",
                "Ingredient_Raw_Fries_Potato.png",
                "Ingredient_Raw_Pasta.png",
            ],
        ),
        (
            ITEMS,
            &[
                "Food_Fried_Potato.json",
                "Food_Pizza_Cheese.json",
                "Ingredient_Raw_Fries_Potato.json",
                "Ingredient_Raw_Pasta.json",
            ],
        ),
        (
            FOOD,
            &[
                "Carbonara.png",
                "Cooked_Pasta.blockymodel",
                "Fried_Patato.blockymodel",
                "Fried_Potato.png",
                "Fries_Texture.png",
                "Pizza.blockymodel",
                "Pizza_Texture.png",
                "Potato_Fries.blockymodel",
                "Raw_Pasta.blockymodel",
                "Raw_Pasta_Texture.png",
            ],
        ),
        (
            EFFECTS,
            &[
                "Food_Instant_Heal_T4.json",
                "FruitVeggie_Buff_T4.json",
                "HealthRegen_Buff_T4.json",
            ],
        ),
        (
            INTERACTIONS,
            &["HealthRegen_TierCheck_T4.json", "FruitVeggie_TierCheck_T4.json"],
        ),
    ];

    let mut keep = vec!["manifest.json".to_string()];
    for (dir, names) in groups {
        keep.extend(names.iter().map(|name| format!("{}{}", dir, name)));
    }

    let steps = vec![
        Step::best_effort(Action::BinaryPatch {
            target: format!("{}Carbonara.png", FOOD),
            delta: "CarbonaraToSpaghetti.patch".into(),
            output: format!("{}Spaghetti.png", FOOD),
        }),
        // The manifest must declare the bundled asset pack or the game
        // ignores the new texture.
        Step::required(Action::SetField {
            document: "manifest.json".into(),
            field: "IncludesAssetPack".into(),
            value: json!(true),
        }),
        Step::best_effort(Action::SetField {
            document: format!("{}Food_Instant_Heal_T4.json", EFFECTS),
            field: "StatModifiers.Health".into(),
            value: json!(30),
        }),
        overwrite(
            "Food_Pasta_Spaghetti.json",
            &format!("{}Food_Pasta_Spaghetti.json", ITEMS),
        ),
        Step::best_effort(Action::DeleteSubtree {
            target: "Server/Languages".into(),
        }),
    ];

    Rule::new(
        "snip3s_foodpack",
        "Found SNIP3'S Food Pack -> Cleaning + Generating Spaghetti",
        Plan::Workspace {
            filter: FilterSpec::keep(keep),
            steps,
        },
    )
}

fn labubu_pets() -> Rule {
    const EGGS: &str = "Server/Item/Items/EggSpawner/";
    const MODELS: &str = "Server/Models/Intelligent/Kweebec/";

    let idle = json!([{
        "Animation": "NPC/Intelligent/Kweebec_Sapling/Animations/LabubuIdle.blockyanim",
        "Speed": 0.5,
        "SoundEventId": "SFX_Labubu_Alerted"
    }]);

    let mut steps: Vec<Step> = [
        "Epics_LabubuEgg_Basic.json",
        "Epics_LabubuEgg_Ears.json",
        "Epics_LabubuEgg_NoEars.json",
    ]
    .iter()
    .map(|name| overwrite(name, &format!("{}{}", EGGS, name)))
    .collect();

    for model in ["LabubuBasic.json", "LabubuNoEars.json"] {
        steps.push(Step::best_effort(Action::SetField {
            document: format!("{}{}", MODELS, model),
            field: "AnimationSets.Idle.Animations".into(),
            value: idle.clone(),
        }));
    }

    Rule::new(
        "labubu_pets",
        "Found Labubu Mod, Making it expensive like the real stuff",
        workspace(steps),
    )
}

fn gambling() -> Rule {
    let steps = vec![
        Step::best_effort(Action::DeleteSubtree {
            target: "Server/Drops/NPCs".into(),
        }),
        overwrite(
            "SlotMachine_Droplist.json",
            "Server/Drops/Items/SlotMachine_Droplist.json",
        ),
        overwrite(
            "ClawMachine_Droplist.json",
            "Server/Drops/Items/ClawMachine_Droplist.json",
        ),
        overwrite(
            "SlotToken.json",
            "Server/Item/Items/Ingredient/SlotToken.json",
        ),
        overwrite(
            "ClawTicket.json",
            "Server/Item/Items/Ingredient/ClawTicket.json",
        ),
    ];
    Rule::new(
        "gambling",
        "Found Gambling -> Adjusting loot table and coin ingredients",
        workspace(steps),
    )
}

fn single_overwrite(name: &str, description: &str, file: &str, target_dir: &str) -> Rule {
    Rule::new(
        name,
        description,
        workspace(vec![overwrite(file, &format!("{}/{}", target_dir, file))]),
    )
}

fn lucky_block() -> Rule {
    let steps = vec![
        overwrite("lucky_block.json", "Server/Item/Items/lucky_block.json"),
        overwrite("Unlucky_Block.json", "Server/Item/Items/Unlucky_Block.json"),
        overwrite(
            "Lucky_Block_Loot_Drop.json",
            "Server/Drops/Lucky_Block_Loot_Drop.json",
        ),
    ];
    Rule::new(
        "keke_lucky_block",
        "Found Lucky Blocks -> Replacing blocks and loot drop",
        workspace(steps),
    )
}

fn walter_white() -> Rule {
    const MERCHANT: &str = "Server/NPC/Roles/Intelligent/Neutral/Kweebec/WalterWhite_Merchant.json";

    let steps = vec![
        overwrite(
            "WalterWhite_Merchant_Shop.json",
            "Server/BarterShops/WalterWhite_Merchant_Shop.json",
        ),
        Step::best_effort(Action::RemoveField {
            document: MERCHANT.into(),
            field: "invulnerable".into(),
        }),
        Step::best_effort(Action::RemoveField {
            document: MERCHANT.into(),
            field: "Invulnerable".into(),
        }),
        Step::best_effort(Action::SetField {
            document: MERCHANT.into(),
            field: "Invulnerable".into(),
            value: json!(true),
        }),
    ];
    Rule::new(
        "walter_white",
        "Found Walter White -> Replacing shop, merchant made invulnerable",
        workspace(steps),
    )
}

fn resurrectable_dinos() -> Rule {
    Rule::new(
        "resurrectable_dinos",
        "Found Resurrectable Dinos -> Removing item recipes",
        workspace(vec![Step::best_effort(Action::StripField {
            directory: "Server/Item/Items".into(),
            field: "Recipe".into(),
        })]),
    )
}

fn overworld() -> Rule {
    let steps = vec![
        Step::best_effort(Action::MergeDirectory {
            source: "Server/instances".into(),
            destination: "Server/Instances".into(),
        }),
        overwrite(
            "Ore_Diamond_Overworld.json",
            "Server/Item/Items/Ore_Diamond_Overworld.json",
        ),
        overwrite(
            "Overworld_Soil_Dirt.json",
            "Server/Item/Items/Overworld_Soil_Dirt.json",
        ),
        Step::best_effort(Action::RemoveField {
            document: "Server/Item/Items/Overworld_Portal_Key.json".into(),
            field: "Recipe".into(),
        }),
    ];
    Rule::new(
        "overworld",
        "Found Overworld -> Fixing instance folder casing and ore items",
        workspace(steps),
    )
}

/// Built-in (predicate, rule) pairs in evaluation order
pub fn builtin_entries() -> Vec<(Predicate, Rule)> {
    vec![
        (contains("ymmersive-melodies"), ymmersive_melodies()),
        (
            Predicate::All {
                of: vec![
                    contains("SNIP3_FoodPack"),
                    Predicate::Suffix {
                        text: ".zip".into(),
                    },
                ],
            },
            snip3s_foodpack(),
        ),
        (contains("EpicsLabubuPets"), labubu_pets()),
        (prefix("GAMBLING"), gambling()),
        (
            prefix("Teto_Plush"),
            single_overwrite(
                "teto_plush",
                "Found Teto Plush -> Replacing plush recipe",
                "Deco_Teto_Plush.json",
                "Server/Item/Items/Deco",
            ),
        ),
        (
            prefix("Violets_Plushies"),
            single_overwrite(
                "violet_plush",
                "Found Violet's Plushies -> Replacing bench recipe",
                "Bench_Violet_Plushie.json",
                "Server/Item/Items/Bench",
            ),
        ),
        (
            prefix("Dungeon.Khaos"),
            single_overwrite(
                "khaos_dungeon",
                "Found Khaos Dungeon -> Replacing portal key",
                "PortalKey_Template.json",
                "Server/Item/Items/Portal",
            ),
        ),
        (prefix("Lucky-Blocks"), lucky_block()),
        (prefix("WalterWhite"), walter_white()),
        (prefix("Resurrectable"), resurrectable_dinos()),
        (prefix("Overworld"), overworld()),
    ]
}
