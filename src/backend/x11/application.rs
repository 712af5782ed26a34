// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! X11 implementation of features at the application scope.
//!
//! The [`Application`] owns the one connection to the display server and
//! the registry of windows served by it, and multiplexes the event stream
//! across those windows on the thread that runs the loop. Window birth and
//! death are staged in side lists and folded into the registry once per
//! drain cycle, never mid-event, so an event can never be dispatched into a
//! window object the registry does not fully own yet.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nix::poll::{poll, PollFd, PollFlags};
use tracing::{debug, error};
use x11rb::protocol::Event;

use crate::error::Error as ShellError;

use super::transport::{ScreenInfo, Transport, XTransport, XWindow};
use super::window::Window;

type Work = Box<dyn FnOnce() + Send>;

#[derive(Clone)]
pub(crate) struct Application {
    /// The connection to the X server, behind the transport seam.
    transport: Rc<dyn Transport>,
    /// The default screen of the connected display.
    screen: ScreenInfo,
    /// Events waiting to be dispatched. Besides buffering, this is where
    /// events get pushed back when their target window is not registered
    /// yet, and where bounded waits requeue events they did not consume.
    pending_events: Rc<RefCell<VecDeque<Event>>>,
    /// The mutable `Application` state.
    state: Rc<RefCell<State>>,
    /// Work scheduled from other threads, run on the dispatch thread.
    work: Arc<Mutex<Vec<Work>>>,
    /// Wake pipe: writing marks async work pending.
    wake_read: RawFd,
    wake_write: RawFd,
    /// Exit pipe: writing requests the loop to stop.
    exit_read: RawFd,
    exit_write: RawFd,
    /// One connection is served by one thread; keep the whole object off
    /// other threads.
    marker: std::marker::PhantomData<*mut ()>,
}

/// The per-connection window registry.
struct State {
    /// All the windows events are currently dispatched to.
    windows: HashMap<XWindow, Rc<Window>>,
    /// Created windows waiting to join `windows` at the next cycle.
    windows_born: Vec<Rc<Window>>,
    /// Destroyed windows waiting to leave `windows` at the next cycle.
    windows_died: Vec<XWindow>,
    /// The window holding pointer capture, if any.
    mouse_capture: Option<XWindow>,
}

impl Application {
    pub fn new() -> Result<Application, ShellError> {
        let transport = XTransport::connect().map_err(super::error::Error::from)?;
        Application::new_with_transport(Rc::new(transport))
    }

    pub(crate) fn new_with_transport(
        transport: Rc<dyn Transport>,
    ) -> Result<Application, ShellError> {
        let screen = transport.screen_info()?;
        let (wake_read, wake_write) = nix::unistd::pipe2(nix::fcntl::OFlag::O_NONBLOCK)
            .map_err(|e| ShellError::Other(Arc::new(e.into())))?;
        let (exit_read, exit_write) = nix::unistd::pipe2(nix::fcntl::OFlag::O_NONBLOCK)
            .map_err(|e| ShellError::Other(Arc::new(e.into())))?;
        Ok(Application {
            transport,
            screen,
            pending_events: Rc::new(RefCell::new(VecDeque::new())),
            state: Rc::new(RefCell::new(State {
                windows: HashMap::new(),
                windows_born: Vec::new(),
                windows_died: Vec::new(),
                mouse_capture: None,
            })),
            work: Arc::new(Mutex::new(Vec::new())),
            wake_read,
            wake_write,
            exit_read,
            exit_write,
            marker: std::marker::PhantomData,
        })
    }

    pub(crate) fn transport(&self) -> Rc<dyn Transport> {
        Rc::clone(&self.transport)
    }

    pub(crate) fn screen(&self) -> ScreenInfo {
        self.screen
    }

    pub(crate) fn pending_events(&self) -> Rc<RefCell<VecDeque<Event>>> {
        Rc::clone(&self.pending_events)
    }

    /// Register a freshly created window.
    ///
    /// It joins the dispatch registry at the start of the next drain cycle.
    pub(crate) fn add_window(&self, window: Rc<Window>) {
        self.state.borrow_mut().windows_born.push(window);
    }

    /// Mark a window as dead.
    ///
    /// It leaves the dispatch registry at the start of the next drain
    /// cycle; events addressed to it are dropped from now on.
    pub(crate) fn remove_window(&self, id: XWindow) {
        self.state.borrow_mut().windows_died.push(id);
    }

    pub(crate) fn window(&self, id: XWindow) -> Option<Rc<Window>> {
        self.state.borrow().windows.get(&id).cloned()
    }

    /// Grant or release pointer capture for `id`.
    ///
    /// At most one window per connection holds capture; releasing only
    /// works for the holder.
    pub(crate) fn set_mouse_capture(&self, id: XWindow, capture: bool) {
        let mut state = self.state.borrow_mut();
        if capture {
            state.mouse_capture = Some(id);
        } else if state.mouse_capture == Some(id) {
            state.mouse_capture = None;
        }
    }

    /// Wake the loop so it notices freshly queued synthetic events.
    pub(crate) fn post_wake(&self) {
        wake_pipe(self.wake_write);
    }

    /// Pump the loop until an exit is requested.
    pub fn run(&self) {
        loop {
            match self.process(None) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    error!("event loop failure: {}", err);
                    break;
                }
            }
        }
    }

    /// Request the loop to stop. Idempotent, callable from any thread
    /// holding a [`LoopHandle`]; this is the same-thread convenience.
    pub fn exit(&self) {
        wake_pipe(self.exit_write);
    }

    pub fn loop_handle(&self) -> LoopHandle {
        LoopHandle {
            work: Arc::clone(&self.work),
            wake_write: self.wake_write,
            exit_write: self.exit_write,
        }
    }

    /// Pump the loop once.
    ///
    /// Blocks on the connection, the wake pipe and the exit pipe for at
    /// most `timeout` (`None` blocks indefinitely). Queued events are
    /// drained each time the connection is readable, after which the
    /// remaining timeout is re-evaluated. Returns `false` as soon as an
    /// exit is signalled, leaving undrained events where they are; `true`
    /// when the timeout elapsed.
    pub fn process(&self, timeout: Option<Duration>) -> Result<bool, ShellError> {
        // An exit requested before (or while) we run takes priority over
        // everything still queued.
        if drain_pipe(self.exit_read) {
            return Ok(false);
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            self.drain_events()?;
            log_x11!(self.transport.flush());

            let poll_timeout = match deadline {
                None => -1,
                Some(deadline) => {
                    let now = Instant::now();
                    if deadline <= now {
                        return Ok(true);
                    }
                    i32::try_from(deadline.duration_since(now).as_millis())
                        .unwrap_or(i32::MAX - 1)
                        .saturating_add(1)
                }
            };

            let mut poll_fds = [
                PollFd::new(self.exit_read, PollFlags::POLLIN),
                PollFd::new(self.wake_read, PollFlags::POLLIN),
                PollFd::new(self.transport.readiness_fd(), PollFlags::POLLIN),
            ];
            let ready = match poll(&mut poll_fds, poll_timeout) {
                Ok(n) => n,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(err) => return Err(ShellError::Other(Arc::new(err.into()))),
            };
            if ready == 0 {
                return Ok(true);
            }
            if readable(poll_fds[0]) {
                drain_pipe(self.exit_read);
                return Ok(false);
            }
            if readable(poll_fds[1]) {
                drain_pipe(self.wake_read);
                self.run_work();
            }
            // Connection readability falls through into the next drain.
        }
    }

    /// Dispatch everything currently queued.
    ///
    /// Events whose target is still in the born list are pushed back and
    /// the cycle ends early, so the registry update below happens before
    /// they are processed. Dead windows are skipped outright. Registry
    /// mutations run once per cycle, between drains.
    fn drain_events(&self) -> Result<(), ShellError> {
        loop {
            let mut deferred_newborn = false;
            loop {
                let event = match self.pending_events.borrow_mut().pop_front() {
                    Some(event) => Some(event),
                    None => self.transport.poll_for_event()?,
                };
                let Some(event) = event else { break };
                let Some(target) = event_window(&event) else {
                    tracing::trace!("dropping windowless event");
                    continue;
                };

                let dispatch = {
                    let state = borrow!(self.state)?;
                    if state.windows_died.contains(&target) {
                        debug!("dropping event for dying window {}", target);
                        continue;
                    }
                    if state.windows_born.iter().any(|w| w.id() == target) {
                        // End this cycle now so the newborn gets registered
                        // before its event is processed.
                        self.pending_events.borrow_mut().push_front(event);
                        deferred_newborn = true;
                        break;
                    }
                    match state.windows.get(&target) {
                        Some(window) => {
                            let capture = state.mouse_capture.and_then(|id| self.window(id));
                            Some((Rc::clone(window), capture))
                        }
                        None => {
                            debug!("dropping event with unknown target window {}", target);
                            None
                        }
                    }
                };
                let Some((window, capture)) = dispatch else {
                    continue;
                };

                window.process_event(&event, capture.as_ref());

                if matches!(event, Event::DestroyNotify(_)) {
                    self.remove_window(target);
                }
            }

            // Windows removed from the registry are dropped only after the
            // state borrow ends; dropping a window runs its destructor,
            // which may call back into the registry.
            let mut removed = Vec::new();
            let registry_changed = {
                let mut state = borrow_mut!(self.state)?;
                let changed =
                    !state.windows_died.is_empty() || !state.windows_born.is_empty();
                let died = std::mem::take(&mut state.windows_died);
                for id in died {
                    if let Some(window) = state.windows.remove(&id) {
                        removed.push(window);
                    }
                    if state.mouse_capture == Some(id) {
                        state.mouse_capture = None;
                    }
                }
                let born = std::mem::take(&mut state.windows_born);
                for window in born {
                    state.windows.insert(window.id(), window);
                }
                changed
            };
            drop(removed);

            // A deferred event can now reach its (registered) window.
            if !(deferred_newborn && registry_changed) {
                return Ok(());
            }
        }
    }

    fn run_work(&self) {
        let work = std::mem::take(&mut *self.work.lock().unwrap());
        for job in work {
            job();
        }
    }
}

/// A cloneable, sendable handle onto the event loop.
///
/// This is the only part of the application that may cross threads: it can
/// schedule work to run on the dispatch thread and request the loop to
/// exit. Both signal through pipes, never by touching shared state.
#[derive(Clone)]
pub struct LoopHandle {
    work: Arc<Mutex<Vec<Work>>>,
    wake_write: RawFd,
    exit_write: RawFd,
}

impl LoopHandle {
    /// Run `work` on the dispatch thread during the next loop iteration.
    pub fn schedule<F: FnOnce() + Send + 'static>(&self, work: F) {
        self.work.lock().unwrap().push(Box::new(work));
        wake_pipe(self.wake_write);
    }

    /// Request the event loop to exit.
    ///
    /// Idempotent; guarantees the next `process` call, including one
    /// already blocked, returns promptly.
    pub fn exit(&self) {
        wake_pipe(self.exit_write);
    }
}

fn readable(fd: PollFd) -> bool {
    fd.revents()
        .unwrap_or_else(PollFlags::empty)
        .contains(PollFlags::POLLIN)
}

fn wake_pipe(fd: RawFd) {
    loop {
        match nix::unistd::write(fd, &[0u8]) {
            Err(nix::errno::Errno::EINTR) => {}
            // A full pipe already counts as signalled.
            Err(nix::errno::Errno::EAGAIN) => break,
            Err(err) => {
                error!("failed to write to wake pipe: {}", err);
                break;
            }
            Ok(_) => break,
        }
    }
}

/// Empty a signalling pipe. Returns whether anything had been written.
fn drain_pipe(fd: RawFd) -> bool {
    let mut was_signalled = false;
    let mut buf = [0u8; 16];
    loop {
        match nix::unistd::read(fd, &mut buf) {
            Err(nix::errno::Errno::EINTR) => {}
            // The outcome of reading an empty O_NONBLOCK pipe.
            Err(nix::errno::Errno::EAGAIN) => break,
            Err(err) => {
                error!("failed to read from pipe: {}", err);
                break;
            }
            Ok(0) => break,
            Ok(_) => was_signalled = true,
        }
    }
    was_signalled
}

/// The window a protocol event is addressed to.
fn event_window(event: &Event) -> Option<XWindow> {
    match event {
        Event::Expose(ev) => Some(ev.window),
        Event::KeyPress(ev) => Some(ev.event),
        Event::KeyRelease(ev) => Some(ev.event),
        Event::ButtonPress(ev) => Some(ev.event),
        Event::ButtonRelease(ev) => Some(ev.event),
        Event::MotionNotify(ev) => Some(ev.event),
        Event::EnterNotify(ev) => Some(ev.event),
        Event::LeaveNotify(ev) => Some(ev.event),
        Event::FocusIn(ev) => Some(ev.event),
        Event::FocusOut(ev) => Some(ev.event),
        Event::ClientMessage(ev) => Some(ev.window),
        Event::ConfigureNotify(ev) => Some(ev.window),
        Event::MapNotify(ev) => Some(ev.window),
        Event::UnmapNotify(ev) => Some(ev.window),
        Event::ReparentNotify(ev) => Some(ev.window),
        Event::GravityNotify(ev) => Some(ev.window),
        Event::CirculateNotify(ev) => Some(ev.window),
        Event::VisibilityNotify(ev) => Some(ev.window),
        Event::PropertyNotify(ev) => Some(ev.window),
        Event::DestroyNotify(ev) => Some(ev.window),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::x11::fake::{self, FakeTransport, RecordingHandler};
    use crate::backend::x11::window::WindowBuilder;
    use kurbo::Size;
    use std::sync::atomic::{AtomicBool, Ordering};
    use test_log::test;

    fn test_app(fake: &Rc<FakeTransport>) -> Application {
        Application::new_with_transport(Rc::clone(fake) as Rc<dyn Transport>).unwrap()
    }

    fn build_window(
        app: &Application,
        size: Size,
    ) -> (
        crate::backend::x11::window::WindowHandle,
        Rc<RefCell<Vec<String>>>,
    ) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut builder = WindowBuilder::new(app.clone());
        builder.set_handler(Box::new(RecordingHandler::new(&log)));
        builder.set_size(size);
        let handle = builder.build().unwrap();
        (handle, log)
    }

    /// Pump once with a zero timeout.
    fn pump(app: &Application) {
        assert!(app.process(Some(Duration::ZERO)).unwrap());
    }

    #[test]
    fn newborn_window_events_dispatch_after_registration() {
        let fake = FakeTransport::new();
        let app = test_app(&fake);
        let (handle, log) = build_window(&app, Size::new(800.0, 600.0));
        let id = handle.native_id();
        log.borrow_mut().clear();

        // The event arrives while the window is still in the born list. If
        // it were dispatched before the registry update it would be dropped
        // as addressed to an unknown window.
        fake.push_event(fake::expose(id, 0, 0, 10, 10));
        pump(&app);

        assert!(log.borrow().iter().any(|e| e == "paint"));
        assert!(app.window(id).is_some());
    }

    #[test]
    fn dead_window_events_are_skipped() {
        let fake = FakeTransport::new();
        let app = test_app(&fake);
        let (handle, log) = build_window(&app, Size::new(800.0, 600.0));
        let id = handle.native_id();
        pump(&app);

        handle.close();
        log.borrow_mut().clear();
        fake.push_event(fake::expose(id, 0, 0, 10, 10));
        pump(&app);

        assert!(log.borrow().is_empty());
        assert!(app.window(id).is_none());
    }

    #[test]
    fn destroy_notify_removes_externally_destroyed_windows() {
        let fake = FakeTransport::new();
        let app = test_app(&fake);
        let (handle, log) = build_window(&app, Size::new(400.0, 300.0));
        let id = handle.native_id();
        pump(&app);

        fake.push_event(fake::destroy_notify(id));
        pump(&app);

        assert!(log.borrow().iter().any(|e| e == "destroyed"));
        assert!(app.window(id).is_none());
    }

    #[test]
    fn exit_unblocks_indefinite_process() {
        let fake = FakeTransport::new();
        let app = test_app(&fake);
        let handle = app.loop_handle();

        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            handle.exit();
        });

        let start = Instant::now();
        let alive = app.process(None).unwrap();
        worker.join().unwrap();

        assert!(!alive);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn exit_wins_over_queued_events() {
        let fake = FakeTransport::new();
        let app = test_app(&fake);
        let (handle, log) = build_window(&app, Size::new(800.0, 600.0));
        let id = handle.native_id();
        pump(&app);
        log.borrow_mut().clear();

        app.exit();
        fake.push_event(fake::expose(id, 0, 0, 10, 10));
        fake.push_event(fake::expose(id, 0, 0, 20, 20));

        assert!(!app.process(None).unwrap());
        // The exit returned before the queue was touched.
        assert_eq!(fake.pending_event_count(), 2);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn exit_is_idempotent() {
        let fake = FakeTransport::new();
        let app = test_app(&fake);
        app.exit();
        app.exit();
        assert!(!app.process(None).unwrap());
        // A fresh process call after the exit drains goes back to pumping.
        assert!(app.process(Some(Duration::ZERO)).unwrap());
    }

    #[test]
    fn scheduled_work_runs_on_the_dispatch_thread() {
        let fake = FakeTransport::new();
        let app = test_app(&fake);
        let handle = app.loop_handle();
        let ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&ran);
        let worker = std::thread::spawn(move || {
            handle.schedule(move || flag.store(true, Ordering::SeqCst));
        });
        worker.join().unwrap();

        assert!(app.process(Some(Duration::from_millis(500))).unwrap());
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn capture_redirects_pointer_events() {
        let fake = FakeTransport::new();
        let app = test_app(&fake);
        let (capture_handle, capture_log) = build_window(&app, Size::new(400.0, 300.0));
        let (other_handle, other_log) = build_window(&app, Size::new(400.0, 300.0));
        let capture_id = capture_handle.native_id();
        let other_id = other_handle.native_id();
        pump(&app);

        // Give both windows known client positions.
        fake.push_event(fake::configure_notify(capture_id, 10, 5, 400, 300));
        fake.push_event(fake::configure_notify(other_id, 30, 40, 400, 300));
        pump(&app);
        capture_handle.capture_mouse(true);
        capture_log.borrow_mut().clear();
        other_log.borrow_mut().clear();

        fake.push_event(fake::button_press(other_id, 1, 10, 20));
        pump(&app);

        // (10 + 30 - 10, 20 + 40 - 5) per the capture translation rule.
        assert_eq!(
            capture_log.borrow().as_slice(),
            ["mouse-down Left 30,55"],
            "capture window sees the translated event"
        );
        assert!(other_log.borrow().is_empty());

        // Releasing capture restores normal delivery.
        capture_handle.capture_mouse(false);
        capture_log.borrow_mut().clear();
        fake.push_event(fake::button_press(other_id, 1, 10, 20));
        pump(&app);
        assert_eq!(other_log.borrow().as_slice(), ["mouse-down Left 10,20"]);
        assert!(capture_log.borrow().is_empty());
    }
}
