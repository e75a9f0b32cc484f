//! Transfers a byte stream between two windows over a simulated lossy link.
//!
//! # Usage
//!
//! Both ends run in the same process on a simulated clock that advances one millisecond per step.
//! Data segments and acknowledgments are dropped at random with the given loss rate, everything
//! else arrives after a fixed one way delay. The delivered stream is checked byte by byte.
//!
//!   > $ cargo run --example window_sim -- -n 262144 --loss 5 --delay 20
//!
//! Pass `--single` to use the engine with a single segment in flight instead.
use std::collections::VecDeque;

use structopt::StructOpt;

use tcpwin::storage::RingBuffer;
use tcpwin::time::{Duration, Instant};
use tcpwin::window::{self, Engine, Pool, RxOutcome, Segment, SingleWindow, Window};
use tcpwin::wire::{TcpSackRange as SackRange, TcpSeqNumber as SeqNumber};

#[derive(Clone, StructOpt)]
struct Config {
    /// Number of bytes to transfer.
    #[structopt(short = "n", default_value = "262144")]
    bytes: usize,
    /// Percentage of packets lost in each direction.
    #[structopt(long = "loss", default_value = "5")]
    loss: u32,
    /// One way delay of the link, in milliseconds.
    #[structopt(long = "delay", default_value = "20")]
    delay: u32,
    /// Seed of the loss generator.
    #[structopt(long = "seed", default_value = "1")]
    seed: u64,
    /// Use the single segment engine.
    #[structopt(long = "single")]
    single: bool,
}

enum Packet {
    Data { seq: SeqNumber, payload: Vec<u8> },
    Ack { ack: SeqNumber, sack: Option<SackRange>, window: u32 },
}

/// The xoshiro256** generator, enough to decide the fate of packets.
struct Xoshiro256 {
    state: [u64; 4],
}

impl Xoshiro256 {
    fn new(seed: u64) -> Self {
        Xoshiro256 {
            state: [seed, seed ^ 0x9e37_79b9_7f4a_7c15, !seed, seed.rotate_left(32)],
        }
    }

    fn next(&mut self) -> u64 {
        let s = &mut self.state;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 17;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);

        result
    }
}

/// A one-directional link with constant delay and uniform loss.
struct Link {
    in_flight: VecDeque<(Instant, Packet)>,
    delay: Duration,
    loss: u32,
    sent: usize,
    lost: usize,
}

impl Link {
    fn new(config: &Config) -> Self {
        Link {
            in_flight: VecDeque::new(),
            delay: Duration::from_millis(config.delay.into()),
            loss: config.loss,
            sent: 0,
            lost: 0,
        }
    }

    fn send(&mut self, packet: Packet, now: Instant, prng: &mut Xoshiro256) {
        self.sent += 1;
        if prng.next() % 100 < u64::from(self.loss) {
            self.lost += 1;
            return;
        }
        self.in_flight.push_back((now + self.delay, packet));
    }

    fn recv(&mut self, now: Instant) -> Option<Packet> {
        match self.in_flight.front() {
            Some((arrival, _)) if *arrival <= now => self.in_flight.pop_front().map(|(_, packet)| packet),
            _ => None,
        }
    }
}

fn pattern(offset: usize) -> u8 {
    (offset % 251) as u8
}

fn main() {
    let config = Config::from_args();
    let window = window::Config::default();

    let start = SeqNumber(0x7fff_f000);
    let result = if config.single {
        transfer(&config, SingleWindow::new(&window, start, start), SingleWindow::new(&window, start, start))
    } else {
        transfer(&config, Window::new(&window, start, start), Window::new(&window, start, start))
    };

    match result {
        Ok(elapsed) => println!("Transferred {} bytes in {} ms", config.bytes, elapsed.as_millis()),
        Err(err) => {
            eprintln!("Transfer failed: {}", err);
            std::process::exit(1);
        },
    }
}

fn transfer<E: Engine>(config: &Config, mut sender: E, mut receiver: E) -> Result<Duration, String> {
    let mut prng = Xoshiro256::new(config.seed);
    let mut tx_pool = Pool::new(vec![Segment::default(); 64]);
    let mut rx_pool = Pool::new(vec![Segment::default(); 64]);
    let mut tx_buffer = RingBuffer::new(vec![0u8; 1 << 16]);
    let mut rx_buffer = RingBuffer::new(vec![0u8; 1 << 16]);
    let tx_storage_len = tx_buffer.capacity() + 1;

    let mut forward = Link::new(config);
    let mut backward = Link::new(config);

    let mut queued = 0;
    let mut delivered = 0;
    let mut peer_window = rx_buffer.capacity() as u32;
    let mut scratch = vec![0u8; 1 << 16];
    let limit = Instant::from_secs(3600);
    let mut now = Instant::from_millis(0);

    while delivered < config.bytes || !sender.tx_done() {
        if now > limit {
            return Err(format!("no progress, {} of {} bytes delivered", delivered, config.bytes));
        }

        // Stage more of the stream.
        let chunk = (config.bytes - queued).min(tx_buffer.space());
        if chunk > 0 {
            let data: Vec<u8> = (queued..queued + chunk).map(pattern).collect();
            let accepted = sender.tx_add(&mut tx_pool, chunk as u32, tx_buffer.head(), tx_storage_len);
            tx_buffer.add(0, Some(&data[..accepted as usize]), accepted as usize);
            queued += accepted as usize;
        }

        while sender.has_data_to_send(&tx_pool, peer_window, now) == Some(Duration::from_millis(0)) {
            let segment = match sender.get(&mut tx_pool, peer_window, now) {
                Some(segment) => segment,
                None => break,
            };
            let offset = tx_buffer.distance(tx_buffer.tail(), segment.stream_position);
            let len = segment.len as usize;
            let read = tx_buffer.get(offset, Some(&mut scratch[..len]), len, true);
            let payload = scratch[..read].to_vec();
            forward.send(Packet::Data { seq: segment.sequence, payload }, now, &mut prng);
        }

        while let Some(packet) = forward.recv(now) {
            let (seq, payload) = match packet {
                Packet::Data { seq, payload } => (seq, payload),
                Packet::Ack { .. } => continue,
            };

            let space = rx_buffer.space() as u32;
            let check = receiver.rx_check(&mut rx_pool, seq, payload.len() as u32, space);
            let payload = &payload[check.skip as usize..];
            match check.outcome {
                RxOutcome::Accept { extra } => {
                    rx_buffer.add(0, Some(payload), payload.len());
                    rx_buffer.add(0, None, extra as usize);
                },
                RxOutcome::StoreAt { offset } => {
                    rx_buffer.add(offset as usize, Some(payload), payload.len());
                },
                _ => (),
            }

            // The application reads everything right away.
            let read = rx_buffer.get(0, Some(&mut scratch[..]), usize::max_value(), false);
            for (index, byte) in scratch[..read].iter().enumerate() {
                if *byte != pattern(delivered + index) {
                    return Err(format!("corrupted byte at offset {}", delivered + index));
                }
            }
            delivered += read;

            let ack = Packet::Ack {
                ack: receiver.rx_current(),
                sack: receiver.sack(),
                window: rx_buffer.space() as u32,
            };
            backward.send(ack, now, &mut prng);
        }

        while let Some(packet) = backward.recv(now) {
            let (ack, sack, window) = match packet {
                Packet::Ack { ack, sack, window } => (ack, sack, window),
                Packet::Data { .. } => continue,
            };

            peer_window = window;
            let mut released = sender.ack(&mut tx_pool, ack, now);
            if let Some(sack) = sack {
                released += sender.ack_sack(&mut tx_pool, sack.first, sack.last, now);
            }
            tx_buffer.get(0, None, released as usize, false);
        }

        now += Duration::from_millis(1);
    }

    println!("Data segments: {} sent, {} lost", forward.sent, forward.lost);
    println!("Acknowledgments: {} sent, {} lost", backward.sent, backward.lost);

    sender.destroy(&mut tx_pool);
    receiver.destroy(&mut rx_pool);
    Ok(now - Instant::from_millis(0))
}
