use anyhow::Result;
use avmaster_game::{
    CableType, ConnectionCategory, ConnectorRef, ConnectorType, GameSession, InstanceId,
    LevelAttempt, Position, ProgressStore,
};

const GRID_COLUMNS: u32 = 5;
const GRID_SPACING: f32 = 120.0;
const GRID_ORIGIN: f32 = 60.0;

/// One connection the scripted player intends to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLink {
    pub from: ConnectorRef,
    pub to: ConnectorRef,
    pub cable: CableType,
    pub category: ConnectionCategory,
}

fn grid_position(index: u32) -> Position {
    let column = index % GRID_COLUMNS;
    let row = index / GRID_COLUMNS;
    #[allow(clippy::cast_precision_loss)]
    Position::new(
        GRID_ORIGIN + column as f32 * GRID_SPACING,
        GRID_ORIGIN + row as f32 * GRID_SPACING,
    )
}

/// Place every toolbar item of the loaded level on a grid. Returns the new
/// instances and whether a placement completed the level.
pub fn place_all<S: ProgressStore>(
    session: &mut GameSession<'_, S>,
) -> Result<(Vec<InstanceId>, bool)> {
    let toolbar = session
        .attempt()
        .map(LevelAttempt::toolbar)
        .unwrap_or_default();
    let mut placed = Vec::new();
    let mut completed = false;
    let mut index = 0_u32;
    for item in toolbar {
        for _ in 0..item.remaining {
            let placement = session.place_equipment(item.slot, grid_position(index))?;
            completed |= placement.completion.is_some();
            placed.push(placement.instance);
            index += 1;
        }
    }
    Ok((placed, completed))
}

/// Links that satisfy every tracked category using the equipment on stage.
/// Categories with no usable rule get no links.
pub fn plan_links(attempt: &LevelAttempt<'_>) -> Vec<PlannedLink> {
    let level = attempt.level();
    let mut links = Vec::new();

    for (category, progress) in attempt.progress().tracked() {
        let mut routes = Vec::new();
        for rule in &level.rules {
            if rule.cable.category() != Some(category) {
                continue;
            }
            let outs = connectors_of(attempt, rule.from);
            let ins = connectors_of(attempt, rule.to);
            if !outs.is_empty() && !ins.is_empty() {
                routes.push((outs, ins, rule.cable));
            }
        }
        if routes.is_empty() {
            continue;
        }
        for k in 0..progress.shortfall() as usize {
            let (outs, ins, cable) = &routes[k % routes.len()];
            let step = k / routes.len();
            links.push(PlannedLink {
                from: outs[step % outs.len()],
                to: ins[step % ins.len()],
                cable: *cable,
                category,
            });
        }
    }
    links
}

fn connectors_of(attempt: &LevelAttempt<'_>, kind: ConnectorType) -> Vec<ConnectorRef> {
    let level = attempt.level();
    attempt
        .placed()
        .iter()
        .flat_map(move |placed| {
            level
                .equipment
                .get(placed.slot)
                .into_iter()
                .flat_map(|spec| spec.connectors.iter().enumerate())
                .filter(move |(_, connector)| connector.kind == kind)
                .map(move |(index, _)| ConnectorRef::new(placed.id, index))
        })
        .collect()
}
