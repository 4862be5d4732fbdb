pub mod replay_buffer_serialization;
pub mod running_mean_std;
