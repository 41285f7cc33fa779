use hellgate::{EmbeddedEngine, EventPriority, EventTime, Hellgate, HostEvent, HostEventKind};
use tracing::info;

use super::textures::TextureRegistry;

/// Anything reacting to phased host events.
pub(crate) trait EventSubscriber {
    fn priority(&self, kind: HostEventKind) -> EventPriority;
    fn on_event(&mut self, event: &HostEvent<'_>, textures: &mut TextureRegistry);
}

impl<E: EmbeddedEngine> EventSubscriber for Hellgate<E> {
    fn priority(&self, kind: HostEventKind) -> EventPriority {
        Hellgate::<E>::priority(kind)
    }

    fn on_event(&mut self, event: &HostEvent<'_>, textures: &mut TextureRegistry) {
        self.handle_event(event, textures);
    }
}

/// Delivers `event` to every subscriber, highest priority first. Subscribers
/// sharing a priority run in the order given.
pub(crate) fn dispatch(
    event: &HostEvent<'_>,
    textures: &mut TextureRegistry,
    subscribers: &mut [&mut dyn EventSubscriber],
) {
    let kind = event.kind();
    let mut order: Vec<usize> = (0..subscribers.len()).collect();
    // Stable sort keeps registration order within one priority.
    order.sort_by(|a, b| {
        subscribers[*b]
            .priority(kind)
            .cmp(&subscribers[*a].priority(kind))
    });
    for index in order {
        subscribers[index].on_event(event, textures);
    }
}

/// Logs completed map loads and counts them.
#[derive(Debug, Default)]
pub(crate) struct MapLoadLogger {
    loads: u32,
}

impl MapLoadLogger {
    pub(crate) fn loads(&self) -> u32 {
        self.loads
    }
}

impl EventSubscriber for MapLoadLogger {
    fn priority(&self, _kind: HostEventKind) -> EventPriority {
        EventPriority::Default
    }

    fn on_event(&mut self, event: &HostEvent<'_>, _textures: &mut TextureRegistry) {
        if let HostEvent::MapLoad {
            time: EventTime::After,
            map,
        } = *event
        {
            self.loads = self.loads.saturating_add(1);
            info!(map, loads = self.loads, "map_loaded");
        }
    }
}
