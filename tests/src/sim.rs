//! In-process ICMP network.
//!
//! Every open channel sees every reply, like a raw socket sees all ICMP
//! traffic of the host, so correlation bugs show up as misattributed
//! replies. Delays are real sleeps.

use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pingstat_common::error::Result;
use pingstat_core::network::transport::{ChannelFactory, IcmpChannel};
use pingstat_protocols::icmp;
use pnet::packet::icmp::IcmpTypes;

const ROUTER_DELAY: Duration = Duration::from_millis(1);
const LOCAL_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 50, 2);

#[derive(Debug, Clone, Copy)]
pub enum Responder {
    /// Answers with Time Exceeded from this address.
    Router(Ipv4Addr),
    /// Answers with Destination Unreachable from this address.
    Unreachable(Ipv4Addr),
    Silent,
    /// Answers with bytes too short for an ICMP header.
    Garbage,
}

#[derive(Debug, Clone, Copy)]
pub enum Echo {
    After(Duration),
    Dropped,
    /// Truncated bytes instead of a reply.
    Garbage,
}

#[derive(Debug, Clone, Default)]
pub struct Route {
    pub hops: Vec<Responder>,
    /// Consumed in order, then `Echo::After(default_delay)` forever.
    pub echoes: Vec<Echo>,
    pub default_delay: Duration,
    /// Precede each reply with one carrying a foreign identifier.
    pub foreign_first: bool,
}

impl Route {
    pub fn direct(delay: Duration) -> Self {
        Self {
            default_delay: delay,
            ..Self::default()
        }
    }

    pub fn via(hops: Vec<Responder>) -> Self {
        Self {
            hops,
            default_delay: Duration::from_millis(2),
            ..Self::default()
        }
    }

    pub fn echoes(mut self, echoes: Vec<Echo>) -> Self {
        self.echoes = echoes;
        self
    }

    pub fn never_answers(self) -> Self {
        let echoes = vec![Echo::Dropped; 256];
        self.echoes(echoes)
    }
}

struct Queued {
    deliver_at: Instant,
    bytes: Vec<u8>,
    source: Ipv4Addr,
}

type Inbox = Arc<Mutex<Vec<Queued>>>;

enum Outcome {
    Hop(Responder),
    Destination { echo: Echo, foreign_first: bool },
}

#[derive(Default)]
struct RouteState {
    route: Route,
    echoes_sent: usize,
}

#[derive(Default)]
pub struct SimNetwork {
    routes: Mutex<HashMap<Ipv4Addr, RouteState>>,
    inboxes: Mutex<Vec<Weak<Mutex<Vec<Queued>>>>>,
}

impl SimNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_route(&self, destination: Ipv4Addr, route: Route) {
        self.routes.lock().insert(destination, RouteState { route, echoes_sent: 0 });
    }

    /// Echo requests that reached `destination` so far.
    pub fn echoes_sent(&self, destination: Ipv4Addr) -> usize {
        self.routes.lock().get(&destination).map_or(0, |s| s.echoes_sent)
    }

    fn broadcast(&self, delay: Duration, bytes: Vec<u8>, source: Ipv4Addr) {
        let deliver_at = Instant::now() + delay;
        let mut inboxes = self.inboxes.lock();
        inboxes.retain(|weak| weak.strong_count() > 0);
        for inbox in inboxes.iter().filter_map(Weak::upgrade) {
            inbox.lock().push(Queued {
                deliver_at,
                bytes: bytes.clone(),
                source,
            });
        }
    }

    fn deliver(&self, ttl: u8, packet: &[u8], destination: Ipv4Addr) -> io::Result<()> {
        let identifier = u16::from_be_bytes([packet[4], packet[5]]);
        let sequence = u16::from_be_bytes([packet[6], packet[7]]);

        let outcome = {
            let mut routes = self.routes.lock();
            let Some(state) = routes.get_mut(&destination) else {
                return Ok(());
            };
            let hop = usize::from(ttl);
            if hop <= state.route.hops.len() {
                Outcome::Hop(state.route.hops[hop - 1])
            } else {
                let echo = state
                    .route
                    .echoes
                    .get(state.echoes_sent)
                    .copied()
                    .unwrap_or(Echo::After(state.route.default_delay));
                state.echoes_sent += 1;
                Outcome::Destination {
                    echo,
                    foreign_first: state.route.foreign_first,
                }
            }
        };

        match outcome {
            Outcome::Hop(Responder::Router(router)) => {
                let exceeded = IcmpTypes::TimeExceeded;
                let bytes =
                    icmp::create_quoting_error(exceeded, 0, LOCAL_ADDR, destination, packet)
                        .map_err(io::Error::other)?;
                self.broadcast(ROUTER_DELAY, bytes, router);
            }
            Outcome::Hop(Responder::Unreachable(router)) => {
                let unreachable = IcmpTypes::DestinationUnreachable;
                let bytes =
                    icmp::create_quoting_error(unreachable, 1, LOCAL_ADDR, destination, packet)
                        .map_err(io::Error::other)?;
                self.broadcast(ROUTER_DELAY, bytes, router);
            }
            Outcome::Hop(Responder::Silent) => {}
            Outcome::Hop(Responder::Garbage) => {
                self.broadcast(ROUTER_DELAY, vec![0x0b, 0x00, 0x00], destination)
            }
            Outcome::Destination {
                echo: Echo::After(delay),
                foreign_first,
            } => {
                if foreign_first {
                    let foreign =
                        icmp::create_echo_reply(!identifier, sequence, icmp::PAYLOAD_MARKER)
                            .map_err(io::Error::other)?;
                    self.broadcast(delay / 2, foreign, destination);
                }
                let reply = icmp::create_echo_reply(identifier, sequence, icmp::PAYLOAD_MARKER)
                    .map_err(io::Error::other)?;
                self.broadcast(delay, reply, destination);
            }
            Outcome::Destination { echo: Echo::Dropped, .. } => {}
            Outcome::Destination { echo: Echo::Garbage, .. } => {
                self.broadcast(ROUTER_DELAY, vec![0x00; 4], destination)
            }
        }
        Ok(())
    }
}

/// Factory handle sharing one simulated network.
#[derive(Clone)]
pub struct SimFactory(pub Arc<SimNetwork>);

impl ChannelFactory for SimFactory {
    fn open(&self) -> Result<Box<dyn IcmpChannel>> {
        let inbox: Inbox = Arc::default();
        self.0.inboxes.lock().push(Arc::downgrade(&inbox));
        Ok(Box::new(SimChannel {
            network: Arc::clone(&self.0),
            inbox,
            ttl: 64,
        }))
    }
}

struct SimChannel {
    network: Arc<SimNetwork>,
    inbox: Inbox,
    ttl: u8,
}

impl IcmpChannel for SimChannel {
    fn set_ttl(&mut self, ttl: u8) -> io::Result<()> {
        self.ttl = ttl;
        Ok(())
    }

    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()> {
        self.network.deliver(self.ttl, packet, destination)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<(Vec<u8>, Ipv4Addr)>> {
        let deadline = Instant::now() + timeout;
        loop {
            let next = {
                let mut inbox = self.inbox.lock();
                let earliest = inbox
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, q)| q.deliver_at)
                    .map(|(i, q)| (i, q.deliver_at));
                match earliest {
                    Some((index, at)) if at <= Instant::now() => {
                        let queued = inbox.remove(index);
                        return Ok(Some((queued.bytes, queued.source)));
                    }
                    Some((_, at)) => Some(at),
                    None => None,
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            // Poll in small steps: other channels may enqueue meanwhile.
            let wake = next.map_or(deadline, |at| at.min(deadline));
            std::thread::sleep(wake.saturating_duration_since(now).min(Duration::from_millis(1)));
        }
    }
}
