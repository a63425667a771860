use std::{sync::Arc, thread::JoinHandle, time::Duration};

use crossbeam::channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use super::{
    frame_driver::{AnimationPlan, FrameDriver, StopHandle, Tick},
    Framebuffer, RenderSettings, Scene,
};
use crate::{
    camera::Camera,
    error::{Error, Result},
    volumetric::{ScalarVolume, Volume},
};

/// Messages to renderer
///
/// While animating, messages are read between frames
pub enum RendererMessage {
    /// Render a single frame with the current camera
    RenderFrame,
    /// Start orbit animation
    Animate(AnimationPlan),
    /// Stop animation before its next frame
    Stop,
    /// Replace camera, applies from the next frame
    SetCamera(Box<Camera>),
    /// Shut down, thread will get ready to be joined
    ShutDown,
}

/// Messages from renderer
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    /// New frame is in the shared buffer
    FrameReady { elapsed: Duration },
    /// Animation frame `step` of `total`
    ///
    /// Shared buffer may already hold a later frame, `frame` is this one.
    AnimationFrame {
        step: usize,
        total: usize,
        frame: Arc<Framebuffer>,
    },
    /// Last animation frame, also copied in `frame`
    AnimationFinished {
        mean: Duration,
        frame: Arc<Framebuffer>,
    },
    AnimationCancelled { rendered: usize },
    /// Request could not be handled
    Failed(String),
}

/// Renderer owning the scene, moved to its own thread by [`RendererFront`]
pub struct RenderThread<V = ScalarVolume>
where
    V: Volume,
{
    scene: Scene<V>,
    settings: RenderSettings,
    camera: Camera,
    driver: FrameDriver,
}

impl<V> RenderThread<V>
where
    V: Volume + Send + Sync + 'static,
{
    pub fn new(scene: Scene<V>, settings: RenderSettings, camera: Camera) -> Self {
        Self {
            scene,
            settings,
            camera,
            driver: FrameDriver::new(),
        }
    }

    fn start(
        self,
        buffer: Arc<Mutex<Framebuffer>>,
        events: Sender<RendererEvent>,
        messages: Receiver<RendererMessage>,
    ) -> Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("Renderer".into())
            .spawn(move || self.run(buffer, events, messages))
            .map_err(|_| Error::InvalidState("cannot spawn render thread"))
    }

    /// Master loop
    fn run(
        mut self,
        buffer: Arc<Mutex<Framebuffer>>,
        events: Sender<RendererEvent>,
        messages: Receiver<RendererMessage>,
    ) {
        let mut canvas = Framebuffer::new(self.settings.resolution);
        let stop = self.driver.stop_handle();

        loop {
            // Block only when there is nothing to animate
            let msg = if self.driver.is_idle() {
                match messages.recv() {
                    Ok(msg) => Some(msg),
                    Err(_) => break,
                }
            } else {
                match messages.try_recv() {
                    Ok(msg) => Some(msg),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            };

            let event = match msg {
                Some(RendererMessage::ShutDown) => break,
                Some(msg) => self.handle_message(msg, &stop, &mut canvas),
                None => self.animation_step(&mut canvas),
            };

            if let Some(event) = event {
                if matches!(
                    event,
                    RendererEvent::FrameReady { .. }
                        | RendererEvent::AnimationFrame { .. }
                        | RendererEvent::AnimationFinished { .. }
                ) {
                    // Publish whole frame
                    std::mem::swap(&mut *buffer.lock(), &mut canvas);
                }
                if events.send(event).is_err() {
                    break;
                }
            }
        }
        tracing::debug!("Render thread finished");
    }

    fn handle_message(
        &mut self,
        msg: RendererMessage,
        stop: &StopHandle,
        canvas: &mut Framebuffer,
    ) -> Option<RendererEvent> {
        match msg {
            RendererMessage::RenderFrame => Some(
                match self
                    .driver
                    .render_once(&self.scene, &self.settings, &self.camera, canvas)
                {
                    Ok(elapsed) => RendererEvent::FrameReady { elapsed },
                    Err(e) => RendererEvent::Failed(e.to_string()),
                },
            ),
            RendererMessage::Animate(plan) => match self.driver.start_animation(plan) {
                Ok(()) => None,
                Err(e) => Some(RendererEvent::Failed(e.to_string())),
            },
            RendererMessage::Stop => {
                if self.driver.is_idle() {
                    None
                } else {
                    // Animation ends at this frame boundary
                    stop.stop();
                    self.animation_step(canvas)
                }
            }
            RendererMessage::SetCamera(camera) => {
                self.camera = *camera;
                None
            }
            RendererMessage::ShutDown => None,
        }
    }

    fn animation_step(&mut self, canvas: &mut Framebuffer) -> Option<RendererEvent> {
        let tick = self
            .driver
            .tick(&self.scene, &self.settings, &mut self.camera, canvas);

        match tick {
            Ok(Tick::Idle) => None,
            Ok(Tick::Rendered { step, total, .. }) => Some(RendererEvent::AnimationFrame {
                step,
                total,
                frame: Arc::new(canvas.clone()),
            }),
            Ok(Tick::Finished { mean }) => Some(RendererEvent::AnimationFinished {
                mean,
                frame: Arc::new(canvas.clone()),
            }),
            Ok(Tick::Cancelled { rendered }) => {
                Some(RendererEvent::AnimationCancelled { rendered })
            }
            Err(e) => Some(RendererEvent::Failed(e.to_string())),
        }
    }
}

/// Communicating with renderer
///
/// Can be active or inactive.
pub struct RendererFront {
    handle: Option<JoinHandle<()>>,
    buffer: Option<Arc<Mutex<Framebuffer>>>,
    communication_in: (Sender<RendererMessage>, Receiver<RendererMessage>),
    communication_out: (Sender<RendererEvent>, Receiver<RendererEvent>),
}

impl RendererFront {
    /// Create inactive front
    pub fn new() -> Self {
        let communication_in = crossbeam::channel::bounded(100); // main -> renderer
        let communication_out = crossbeam::channel::unbounded(); // renderer -> main
        Self {
            handle: None,
            buffer: None,
            communication_in,
            communication_out,
        }
    }

    /// Getter for sender
    /// Returned struct can be used to send commands to renderer
    pub fn get_sender(&self) -> Sender<RendererMessage> {
        self.communication_in.0.clone()
    }

    /// Send message to renderer
    pub fn send_message(&self, msg: RendererMessage) -> Result<()> {
        if self.handle.is_none() {
            return Err(Error::InvalidState("renderer is not running"));
        }
        self.communication_in
            .0
            .send(msg)
            .map_err(|_| Error::InvalidState("renderer is not running"))
    }

    /// Getter for event receiver
    pub fn get_receiver(&self) -> Receiver<RendererEvent> {
        self.communication_out.1.clone()
    }

    /// Receive event from renderer
    ///
    /// Blocking call
    pub fn receive_event(&self) -> Result<RendererEvent> {
        if self.handle.is_none() {
            return Err(Error::InvalidState("renderer is not running"));
        }
        self.communication_out
            .1
            .recv()
            .map_err(|_| Error::InvalidState("renderer is not running"))
    }

    /// Getter for shared framebuffer
    /// If front is inactive, return `None`
    pub fn get_buffer_handle(&self) -> Option<Arc<Mutex<Framebuffer>>> {
        self.buffer.as_ref().cloned()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Start `renderer`
    ///
    /// Front goes into active state.
    /// If front was already active, previous renderer gets shutdown first.
    /// Renderer waits for messages, does _not_ start rendering.
    pub fn start_rendering<V>(&mut self, renderer: RenderThread<V>) -> Result<()>
    where
        V: Volume + Send + Sync + 'static,
    {
        // Shutdown if needed
        if self.handle.is_some() {
            tracing::info!("Shutting down current renderer");
            self.finish();
        }

        // Drop events of the previous renderer
        while self.communication_out.1.try_recv().is_ok() {}

        let buffer = Arc::new(Mutex::new(Framebuffer::new(renderer.settings.resolution)));
        let handle = renderer.start(
            buffer.clone(),
            self.communication_out.0.clone(),
            self.communication_in.1.clone(),
        )?;

        self.buffer = Some(buffer);
        self.handle = Some(handle);
        Ok(())
    }

    /// Shut the renderer down and sync thread with parent
    ///
    /// Call is blocking until thread is joined.
    /// Front goes into inactive state.
    pub fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            // Stop animation first, shutdown is read at the next frame boundary
            let _ = self.communication_in.0.send(RendererMessage::Stop);
            let _ = self.communication_in.0.send(RendererMessage::ShutDown);
            if handle.join().is_err() {
                tracing::warn!("Render thread panicked");
            }
            self.buffer = None;
        }
        // Messages the old renderer did not read
        while self.communication_in.1.try_recv().is_ok() {}
    }
}

impl Default for RendererFront {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RendererFront {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::test_helpers::*;

    fn start_front() -> RendererFront {
        let scene = uniform_scene(0.5, 1.0);
        let camera = camera_looking_at(&scene.volume);
        let settings = RenderSettings::builder()
            .resolution((6, 4))
            .sample_distance(0.5)
            .build()
            .unwrap();

        let mut front = RendererFront::new();
        front
            .start_rendering(RenderThread::new(scene, settings, camera))
            .unwrap();
        front
    }

    #[test]
    fn inactive_front() {
        let front = RendererFront::new();
        assert!(!front.is_active());
        assert!(front.get_buffer_handle().is_none());
        assert!(matches!(
            front.send_message(RendererMessage::RenderFrame),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn single_frame() {
        let mut front = start_front();
        front.send_message(RendererMessage::RenderFrame).unwrap();

        let event = front.receive_event().unwrap();
        assert!(matches!(event, RendererEvent::FrameReady { .. }));

        let buffer = front.get_buffer_handle().unwrap();
        let fb = buffer.lock();
        assert_eq!(fb.resolution(), (6, 4));
        // opaque pixel everywhere
        assert_eq!(fb.pixel(0, 0)[3], 255);
        drop(fb);

        front.finish();
        assert!(!front.is_active());
    }

    #[test]
    fn animation_events() {
        let mut front = start_front();
        front
            .send_message(RendererMessage::Animate(AnimationPlan {
                steps: 3,
                ..Default::default()
            }))
            .unwrap();

        let mut frames = 0;
        loop {
            match front.receive_event().unwrap() {
                RendererEvent::AnimationFrame { .. } => frames += 1,
                RendererEvent::AnimationFinished { .. } => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(frames, 2);
    }

    #[test]
    fn animation_frames_survive_slow_reader() {
        let plan = AnimationPlan {
            steps: 3,
            azimuth: 40.0,
            elevation: 0.0,
        };
        let settings = RenderSettings::builder()
            .resolution((12, 12))
            .sample_distance(0.25)
            .build()
            .unwrap();
        let start_camera = camera_looking_at(&ramp_volume());

        // Same frames rendered on this thread
        let scene = ramp_scene();
        let mut camera = start_camera.clone();
        let mut driver = FrameDriver::new();
        driver.start_animation(plan).unwrap();
        let mut expected = Vec::new();
        loop {
            let mut fb = Framebuffer::new((12, 12));
            let tick = driver.tick(&scene, &settings, &mut camera, &mut fb).unwrap();
            expected.push(fb);
            if matches!(tick, Tick::Finished { .. }) {
                break;
            }
        }
        assert_eq!(expected.len(), 3);
        assert_ne!(expected[0], expected[2]);

        let mut front = RendererFront::new();
        front
            .start_rendering(RenderThread::new(ramp_scene(), settings, start_camera))
            .unwrap();
        front.send_message(RendererMessage::Animate(plan)).unwrap();
        let buffer = front.get_buffer_handle().unwrap();

        // Renderer runs ahead while this thread sleeps
        std::thread::sleep(Duration::from_millis(300));

        let mut received = Vec::new();
        loop {
            match front.receive_event().unwrap() {
                RendererEvent::AnimationFrame { step, frame, .. } => {
                    assert_eq!(step, received.len() + 1);
                    received.push(frame);
                }
                RendererEvent::AnimationFinished { frame, .. } => {
                    received.push(frame);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(received.len(), 3);
        for (step, (frame, expected)) in received.iter().zip(&expected).enumerate() {
            assert_eq!(**frame, *expected, "frame {}", step + 1);
        }
        assert_eq!(*buffer.lock(), expected[2]);
        front.finish();
    }
}
