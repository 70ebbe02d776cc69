//! Paddle game state. Advanced in fixed 60 Hz steps and never touches rendering.
pub const FIELD_WIDTH: f32 = 640.0;
pub const FIELD_HEIGHT: f32 = 480.0;
pub const STEP_SECONDS: f64 = 1.0 / 60.0;
pub const PADDLE_WIDTH: f32 = 10.0;
pub const PADDLE_HEIGHT: f32 = 80.0;
/// How far one blink moves the left paddle.
pub const BLINK_STEP: f32 = 20.0;
/// Per-step speed of the keyboard or NPC controlled right paddle.
pub const RIGHT_PADDLE_SPEED: f32 = 5.0;
const NPC_SPEED: f32 = 3.5;
pub const BALL_SIZE: f32 = 10.0;
const BALL_DX: f32 = 3.0;
const BALL_DY: f32 = 2.0;
const PADDLE_MARGIN: f32 = 50.0;
/// Everything the game needs from the outside world for one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub blink: bool,
    pub right_up: bool,
    pub right_down: bool,
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paddle {
    pub x: f32,
    pub y: f32,
}
impl Paddle {
    fn centred(x: f32) -> Self {
        Self {
            x,
            y: FIELD_HEIGHT / 2.0 - PADDLE_HEIGHT / 2.0,
        }
    }
    fn clamp(&mut self) {
        self.y = self.y.clamp(0.0, FIELD_HEIGHT - PADDLE_HEIGHT);
    }
    fn covers(&self, y: f32) -> bool {
        y >= self.y && y <= self.y + PADDLE_HEIGHT
    }
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}
#[derive(Clone, Debug)]
pub struct PongGame {
    pub left: Paddle,
    pub right: Paddle,
    pub ball: Ball,
    pub score_left: u32,
    pub score_right: u32,
    /// +1 moves the next blink towards larger y, then flips.
    blink_direction: f32,
    npc: bool,
}
impl PongGame {
    pub fn new(npc: bool) -> Self {
        Self {
            left: Paddle::centred(PADDLE_MARGIN),
            right: Paddle::centred(FIELD_WIDTH - PADDLE_MARGIN - PADDLE_WIDTH),
            ball: Ball {
                x: FIELD_WIDTH / 2.0,
                y: FIELD_HEIGHT / 2.0,
                dx: BALL_DX,
                dy: BALL_DY,
            },
            score_left: 0,
            score_right: 0,
            blink_direction: 1.0,
            npc,
        }
    }
    pub fn is_npc(&self) -> bool {
        self.npc
    }
    pub fn step(&mut self, input: &FrameInput) {
        if input.blink {
            self.handle_blink();
        }
        self.move_right_paddle(input);
        self.update_ball();
    }
    /// Each blink moves the left paddle one step, alternating direction.
    pub fn handle_blink(&mut self) {
        self.left.y += self.blink_direction * BLINK_STEP;
        self.blink_direction = -self.blink_direction;
        self.left.clamp();
    }
    fn move_right_paddle(&mut self, input: &FrameInput) {
        if self.npc {
            let target = self.ball.y + BALL_SIZE / 2.0 - PADDLE_HEIGHT / 2.0;
            let delta = (target - self.right.y).clamp(-NPC_SPEED, NPC_SPEED);
            self.right.y += delta;
        } else {
            if input.right_up {
                self.right.y -= RIGHT_PADDLE_SPEED;
            }
            if input.right_down {
                self.right.y += RIGHT_PADDLE_SPEED;
            }
        }
        self.right.clamp();
    }
    fn update_ball(&mut self) {
        let ball = &mut self.ball;
        ball.x += ball.dx;
        ball.y += ball.dy;
        if ball.y <= 0.0 || ball.y >= FIELD_HEIGHT - BALL_SIZE {
            ball.dy = -ball.dy;
            ball.y = ball.y.clamp(0.0, FIELD_HEIGHT - BALL_SIZE);
        }
        let left_face = self.left.x + PADDLE_WIDTH;
        if ball.dx < 0.0 && ball.x <= left_face && ball.x >= self.left.x && self.left.covers(ball.y) {
            ball.dx = -ball.dx;
            ball.x = left_face;
        }
        let right_face = self.right.x - BALL_SIZE;
        if ball.dx > 0.0
            && ball.x >= right_face
            && ball.x <= self.right.x + PADDLE_WIDTH
            && self.right.covers(ball.y)
        {
            ball.dx = -ball.dx;
            ball.x = right_face;
        }
        if ball.x < 0.0 {
            self.score_right += 1;
            self.reset_ball();
        } else if ball.x > FIELD_WIDTH {
            self.score_left += 1;
            self.reset_ball();
        }
    }
    /// Back to the centre, serving towards the other side.
    fn reset_ball(&mut self) {
        self.ball.x = FIELD_WIDTH / 2.0;
        self.ball.y = FIELD_HEIGHT / 2.0;
        self.ball.dx = -self.ball.dx;
    }
}
