//! Character-stream bridge over one shared message buffer.
//!
//! Every handle sees the same buffer. A write replaces the buffered
//! message, a read hands over the whole message and empties the buffer.
//! Each operation runs under the bridge's mutex, so a reader gets
//! either nothing or one complete message.
//!
//! With `NoopRawMutex` the bridge cannot be shared between threads:
//!
//! ```compile_fail
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use mpu9260::DeviceBridge;
//!
//! let bridge: DeviceBridge<NoopRawMutex> = DeviceBridge::new();
//! std::thread::scope(|s| {
//!     s.spawn(|| bridge.open());
//! });
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Capacity of the message buffer exposed through the device node
pub const MESSAGE_CAPACITY: usize = 256;

/// Data could not be moved across the caller boundary
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CopyFault;

/// Caller-owned memory the bridge copies data in from
pub trait UserSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill all of `dst` from the start of this source
    fn copy_into(&self, dst: &mut [u8]) -> Result<(), CopyFault>;
}

/// Caller-owned memory the bridge copies data out to
pub trait UserSink {
    /// Most bytes this sink can take
    fn capacity(&self) -> usize;

    /// Store all of `src` at the start of this sink.
    ///
    /// Runs with the bridge locked. A nested `read` or `write` on the same
    /// bridge fails with `CopyFault`; `open` and the queries must not be
    /// called from here.
    fn copy_from(&mut self, src: &[u8]) -> Result<(), CopyFault>;
}

impl UserSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_into(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        let src = self.get(..dst.len()).ok_or(CopyFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserSink for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        let dst = self.get_mut(..src.len()).ok_or(CopyFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// Returned by `open`. Carries no state; all handles share one buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OpenHandle {
    ordinal: u32,
}

impl OpenHandle {
    /// Open count at the time this handle was issued
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferState {
    Empty,
    HasData,
}

struct Shared<const N: usize> {
    message: [u8; N],
    len: usize,
    opens: u32,
}

pub struct DeviceBridge<M: RawMutex, const N: usize = MESSAGE_CAPACITY> {
    shared: Mutex<M, RefCell<Shared<N>>>,
}

impl<M: RawMutex, const N: usize> DeviceBridge<M, N> {
    pub const fn new() -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                message: [0; N],
                len: 0,
                opens: 0,
            })),
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Count the open and hand out a handle. Never fails.
    pub fn open(&self) -> OpenHandle {
        let ordinal = self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            shared.opens = shared.opens.wrapping_add(1);
            shared.opens
        });
        diag!(Info, "acelChar: Device has been opened {} time(s)", ordinal);
        OpenHandle { ordinal }
    }

    /// Replace the buffered message with `src`.
    ///
    /// At most `N` bytes are stored; the returned count is the number
    /// stored, so a count below `src.len()` means the message was cut.
    /// On `CopyFault` the previous message is kept.
    pub fn write<S>(&self, _handle: &OpenHandle, src: &S) -> Result<usize, CopyFault>
    where
        S: UserSource + ?Sized,
    {
        let requested = src.len();
        let stored = requested.min(N);

        let mut staged = [0u8; N];
        if let Err(fault) = src.copy_into(&mut staged[..stored]) {
            diag!(Warn, "acelChar: Failed to receive {} characters from the user", requested);
            return Err(fault);
        }

        self.shared.lock(|cell| {
            let mut shared = cell.try_borrow_mut().map_err(|_| CopyFault)?;
            shared.message[..stored].copy_from_slice(&staged[..stored]);
            shared.len = stored;
            Ok::<(), CopyFault>(())
        })?;

        if stored < requested {
            diag!(Warn, "acelChar: message cut to {} of {} characters", stored, requested);
        }
        diag!(Info, "acelChar: Received {} characters from the user", stored);
        Ok(stored)
    }

    /// Hand the whole buffered message to `sink` and empty the buffer.
    ///
    /// Returns the number of bytes delivered, zero when nothing is buffered.
    /// If the sink cannot take the whole message the buffer is left as it was.
    pub fn read<S>(&self, _handle: &OpenHandle, sink: &mut S) -> Result<usize, CopyFault>
    where
        S: UserSink + ?Sized,
    {
        let outcome = self.shared.lock(|cell| {
            // busy means we were called from inside a sink of this bridge
            let mut shared = cell.try_borrow_mut().map_err(|_| 0usize)?;
            let len = shared.len;
            if len > sink.capacity() {
                return Err(len);
            }
            sink.copy_from(&shared.message[..len]).map_err(|_| len)?;
            shared.len = 0;
            Ok(len)
        });

        match outcome {
            Ok(sent) => {
                diag!(Info, "acelChar: Sent {} characters to the user", sent);
                Ok(sent)
            }
            Err(pending) => {
                diag!(Warn, "acelChar: Failed to send {} characters to the user", pending);
                Err(CopyFault)
            }
        }
    }

    /// Close notification. Changes nothing; safe to repeat.
    pub fn release(&self, handle: &OpenHandle) {
        diag!(Info, "acelChar: Device successfully closed ({})", handle.ordinal);
    }

    /// Bytes currently buffered
    pub fn pending(&self) -> usize {
        self.shared.lock(|cell| cell.borrow().len)
    }

    pub fn state(&self) -> BufferState {
        if self.pending() == 0 {
            BufferState::Empty
        } else {
            BufferState::HasData
        }
    }

    pub fn open_count(&self) -> u32 {
        self.shared.lock(|cell| cell.borrow().opens)
    }
}

impl<M: RawMutex, const N: usize> Default for DeviceBridge<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type Bridge = DeviceBridge<NoopRawMutex>;

    /// Caller memory that cannot be touched
    struct Inaccessible;

    impl UserSource for Inaccessible {
        fn len(&self) -> usize {
            8
        }

        fn copy_into(&self, _dst: &mut [u8]) -> Result<(), CopyFault> {
            Err(CopyFault)
        }
    }

    impl UserSink for Inaccessible {
        fn capacity(&self) -> usize {
            MESSAGE_CAPACITY
        }

        fn copy_from(&mut self, _src: &[u8]) -> Result<(), CopyFault> {
            Err(CopyFault)
        }
    }

    #[test]
    fn write_then_read_round_trip() {
        let bridge = Bridge::new();
        let h = bridge.open();

        assert_eq!(bridge.write(&h, &b"hello"[..]), Ok(5));
        assert_eq!(bridge.state(), BufferState::HasData);

        let mut out = [0u8; 64];
        assert_eq!(bridge.read(&h, &mut out[..]), Ok(5));
        assert_eq!(&out[..5], b"hello");
        assert_eq!(bridge.state(), BufferState::Empty);
    }

    #[test]
    fn read_before_any_write_is_empty() {
        let bridge = Bridge::new();
        let h = bridge.open();
        let mut out = [0xAAu8; 16];

        assert_eq!(bridge.read(&h, &mut out[..]), Ok(0));
        assert_eq!(out, [0xAA; 16]);
        assert_eq!(bridge.state(), BufferState::Empty);
    }

    #[test]
    fn read_is_destructive() {
        let bridge = Bridge::new();
        let h = bridge.open();
        let mut out = [0u8; 16];

        bridge.write(&h, &b"once"[..]).unwrap();
        assert_eq!(bridge.read(&h, &mut out[..]), Ok(4));
        assert_eq!(bridge.read(&h, &mut out[..]), Ok(0));
    }

    #[test]
    fn write_replaces_previous_message() {
        let bridge = Bridge::new();
        let h = bridge.open();
        let mut out = [0u8; 16];

        bridge.write(&h, &b"a longer message"[..]).unwrap();
        bridge.write(&h, &b"short"[..]).unwrap();
        assert_eq!(bridge.read(&h, &mut out[..]), Ok(5));
        assert_eq!(&out[..5], b"short");
    }

    #[test]
    fn oversized_write_is_cut_to_capacity() {
        let bridge = Bridge::new();
        let h = bridge.open();
        let big = [0x5Au8; MESSAGE_CAPACITY + 44];

        assert_eq!(bridge.write(&h, &big[..]), Ok(MESSAGE_CAPACITY));
        assert_eq!(bridge.pending(), MESSAGE_CAPACITY);

        let mut out = [0u8; MESSAGE_CAPACITY];
        assert_eq!(bridge.read(&h, &mut out[..]), Ok(MESSAGE_CAPACITY));
        assert!(out.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn small_capacity_bridge() {
        let bridge: DeviceBridge<NoopRawMutex, 4> = DeviceBridge::new();
        let h = bridge.open();
        assert_eq!(bridge.capacity(), 4);
        assert_eq!(bridge.write(&h, &b"abcdef"[..]), Ok(4));

        let mut out = [0u8; 8];
        assert_eq!(bridge.read(&h, &mut out[..]), Ok(4));
        assert_eq!(&out[..4], b"abcd");
    }

    #[test]
    fn read_fault_keeps_message() {
        let bridge = Bridge::new();
        let h = bridge.open();
        bridge.write(&h, &b"keep me"[..]).unwrap();

        assert_eq!(bridge.read(&h, &mut Inaccessible), Err(CopyFault));
        assert_eq!(bridge.pending(), 7);

        let mut out = [0u8; 16];
        assert_eq!(bridge.read(&h, &mut out[..]), Ok(7));
        assert_eq!(&out[..7], b"keep me");
    }

    #[test]
    fn read_into_short_destination_faults() {
        let bridge = Bridge::new();
        let h = bridge.open();
        bridge.write(&h, &b"hello"[..]).unwrap();

        let mut tiny = [0u8; 3];
        assert_eq!(bridge.read(&h, &mut tiny[..]), Err(CopyFault));
        assert_eq!(tiny, [0; 3]);
        assert_eq!(bridge.state(), BufferState::HasData);
    }

    #[test]
    fn write_fault_keeps_previous_message() {
        let bridge = Bridge::new();
        let h = bridge.open();
        bridge.write(&h, &b"before"[..]).unwrap();

        assert_eq!(bridge.write(&h, &Inaccessible), Err(CopyFault));

        let mut out = [0u8; 16];
        assert_eq!(bridge.read(&h, &mut out[..]), Ok(6));
        assert_eq!(&out[..6], b"before");
    }

    #[test]
    fn empty_write_empties_buffer() {
        let bridge = Bridge::new();
        let h = bridge.open();
        bridge.write(&h, &b"data"[..]).unwrap();
        assert_eq!(bridge.write(&h, &b""[..]), Ok(0));
        assert_eq!(bridge.state(), BufferState::Empty);
    }

    #[test]
    fn opens_are_counted_and_release_is_idempotent() {
        let bridge = Bridge::new();
        let first = bridge.open();
        let second = bridge.open();
        assert_eq!(first.ordinal(), 1);
        assert_eq!(second.ordinal(), 2);

        bridge.write(&first, &b"shared"[..]).unwrap();
        bridge.release(&first);
        bridge.release(&first);
        assert_eq!(bridge.open_count(), 2);

        // the second handle sees what the first one wrote
        let mut out = [0u8; 16];
        assert_eq!(bridge.read(&second, &mut out[..]), Ok(6));
        bridge.release(&second);
        assert_eq!(bridge.open_count(), 2);
    }

    /// Sink that tries to use the bridge again while a read is copying out
    struct Reentrant<'a> {
        bridge: &'a Bridge,
        handle: OpenHandle,
        nested_read: Option<Result<usize, CopyFault>>,
        nested_write: Option<Result<usize, CopyFault>>,
        received: Vec<u8>,
    }

    impl UserSink for Reentrant<'_> {
        fn capacity(&self) -> usize {
            MESSAGE_CAPACITY
        }

        fn copy_from(&mut self, src: &[u8]) -> Result<(), CopyFault> {
            let mut scratch = [0u8; 16];
            self.nested_read = Some(self.bridge.read(&self.handle, &mut scratch[..]));
            self.nested_write = Some(self.bridge.write(&self.handle, &b"sneak"[..]));
            self.received = src.to_vec();
            Ok(())
        }
    }

    #[test]
    fn nested_use_from_sink_faults_without_panicking() {
        let bridge = Bridge::new();
        let handle = bridge.open();
        bridge.write(&handle, &b"outer"[..]).unwrap();

        let mut sink = Reentrant {
            bridge: &bridge,
            handle,
            nested_read: None,
            nested_write: None,
            received: Vec::new(),
        };
        assert_eq!(bridge.read(&handle, &mut sink), Ok(5));

        assert_eq!(sink.nested_read, Some(Err(CopyFault)));
        assert_eq!(sink.nested_write, Some(Err(CopyFault)));
        assert_eq!(sink.received, b"outer".to_vec());
        // the nested write did not land
        assert_eq!(bridge.state(), BufferState::Empty);
    }

    #[test]
    fn source_emptiness_follows_length() {
        assert!(UserSource::is_empty(&b""[..]));
        assert!(!UserSource::is_empty(&b"x"[..]));
        assert!(!Inaccessible.is_empty());
    }
}
