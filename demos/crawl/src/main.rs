use delve::prelude::*;
use delve::telemetry;
use rand::Rng;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Hand-authored rooms
// ---------------------------------------------------------------------------

fn authored_rooms() -> Vec<RoomDefinition> {
    vec![
        RoomDefinition::new("A", "Entrance Hall")
            .starting()
            .with_door(Direction::East, Edge::to("B"))
            .with_item(ContentSpawn::new("torch").at(Position::new(-2.0, 1.0))),
        RoomDefinition::new("B", "Long Corridor")
            .with_door(Direction::West, Edge::to("A"))
            .with_floor(FloorKind::StairsDown, Edge::to("C"))
            .with_hazard(ContentSpawn::new("spikes").with_property("damage", 2)),
        RoomDefinition::new("C", "Flooded Cellar")
            .on_floor(-1)
            .with_floor(FloorKind::StairsUp, Edge::to("B"))
            // The vault does not exist yet; it is generated on first approach.
            .with_door(Direction::East, Edge::to("vault").locked("iron_key"))
            .with_enemy(ContentSpawn::new("rat").at(Position::new(2.0, -1.0))),
    ]
}

// ---------------------------------------------------------------------------
// Runtime room generator
// ---------------------------------------------------------------------------

const ENEMY_KINDS: [&str; 3] = ["rat", "skeleton", "slime"];
const LOOT_KINDS: [&str; 3] = ["coin", "potion", "scroll"];

fn generate_room(rng: &mut impl Rng, id: &str, entrance_from: &str) -> RoomDefinition {
    let mut room = RoomDefinition::new(id, format!("Generated {id}"))
        .on_floor(-1)
        .with_door(Direction::West, Edge::to(entrance_from))
        .with_secret_passage("crack", Edge::to("A").at(Position::new(0.0, 4.0)))
        .exit();

    for _ in 0..rng.random_range(1..=3) {
        let kind = ENEMY_KINDS[rng.random_range(0..ENEMY_KINDS.len())];
        let position = Position::new(rng.random_range(-5.0..5.0), rng.random_range(-3.0..3.0));
        room = room.with_enemy(
            ContentSpawn::new(kind)
                .at(position)
                .with_property("hp", rng.random_range(3..12)),
        );
    }

    let loot = LOOT_KINDS[rng.random_range(0..LOOT_KINDS.len())];
    room.with_item(ContentSpawn::new(loot).with_property("value", serde_json::json!(rng.random_range(1..50))))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), DelveError> {
    telemetry::init_logging("info");

    let dungeon = Dungeon::builder().rooms(authored_rooms()).build().await?;

    let mut events = dungeon.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RoomEvent::RoomTransition { from, to } => {
                    info!(from = ?from.map(|id| id.to_string()), %to, "leaving room")
                }
                RoomEvent::RoomLoadCompleted { definition, spawn } => {
                    info!(room = %definition.name, %spawn, "player placed")
                }
                RoomEvent::RoomEntered { room } => info!(%room, "door creaks shut"),
                RoomEvent::RoomLoadStarted { .. } => {}
            }
        }
    });

    dungeon.load_starting().await?;
    dungeon.traverse_door(Direction::East).await?;
    dungeon.traverse_floor(FloorKind::StairsDown).await?;

    let registrar = dungeon.registrar();
    let vault = RoomId::new("vault");
    if !registrar.contains(&vault) {
        let room = generate_room(&mut rand::rng(), vault.as_str(), "C");
        info!(room = %room.id, enemies = room.enemies.len(), "generated room");
        registrar.register(room);
    }

    if let Some(door) = dungeon.engine().door(Direction::East) {
        if let Some(key) = door.required_key.as_deref() {
            info!(key, "unlocking door");
        }
    }
    dungeon.traverse_door(Direction::East).await?;

    // Found a crack in the vault wall.
    let report = dungeon.traverse_secret_passage("crack", "A").await?;
    info!(room = %report.to, spawn = ?report.spawn, "back at the entrance");

    if let Err(e) = dungeon.traverse_door(Direction::North).await {
        warn!(error = %e, "bumped into a wall");
    }

    let metrics = dungeon.engine().metrics();
    info!(
        started = metrics.transitions_started,
        completed = metrics.transitions_completed,
        faults = metrics.build_faults,
        "crawl finished"
    );
    dungeon.shutdown().await;
    Ok(())
}
