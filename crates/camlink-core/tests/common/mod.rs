pub mod fake_camera;
