use candle_core::{Device, Result, Tensor};
use oprl_core::replay_buffer::{ReplayBuffer, Transition};

fn transition(value: f32, done: bool) -> Transition {
    let device = Device::Cpu;
    Transition {
        state: Tensor::from_slice(&[value], 1, &device).unwrap(),
        action: Tensor::from_slice(&[value * 10.], 1, &device).unwrap(),
        reward: value,
        next_state: Tensor::from_slice(&[value + 1.], 1, &device).unwrap(),
        done,
    }
}

#[test]
fn buffer_is_bounded_and_overwrites_oldest() -> Result<()> {
    let mut buffer = ReplayBuffer::new(4);
    for i in 0..6 {
        buffer.push(transition(i as f32, false));
    }
    assert_eq!(buffer.len(), 4);
    assert!(buffer.is_full());
    // pushes 4 and 5 overwrote the transitions for 0 and 1
    let stored: Vec<f32> = buffer.rewards.clone();
    assert!(stored.contains(&4.));
    assert!(stored.contains(&5.));
    assert!(!stored.contains(&0.));
    assert!(!stored.contains(&1.));
    Ok(())
}

#[test]
fn sampled_batches_have_the_right_shapes() -> Result<()> {
    let mut buffer = ReplayBuffer::new(16);
    for i in 0..10 {
        buffer.push(transition(i as f32, i % 3 == 0));
    }
    let batch = buffer.sample(8, &Device::Cpu)?;
    assert_eq!(batch.observations.dims(), &[8, 1]);
    assert_eq!(batch.actions.dims(), &[8, 1]);
    assert_eq!(batch.next_observations.dims(), &[8, 1]);
    assert_eq!(batch.rewards.dims(), &[8, 1]);
    assert_eq!(batch.dones.dims(), &[8, 1]);
    // the done mask is a 0/1 float mask
    let dones: Vec<f32> = batch.dones.flatten_all()?.to_vec1()?;
    assert!(dones.iter().all(|d| *d == 0. || *d == 1.));
    Ok(())
}

#[test]
fn sampling_more_than_stored_fails() {
    let mut buffer = ReplayBuffer::new(8);
    buffer.push(transition(1., false));
    assert!(buffer.sample(2, &Device::Cpu).is_err());
}

#[test]
fn sampling_is_reproducible_under_the_same_seed() -> Result<()> {
    let mut buffer = ReplayBuffer::new(32);
    for i in 0..20 {
        buffer.push(transition(i as f32, false));
    }
    oprl_core::rng::set_seed(1626);
    let first = buffer.sample(8, &Device::Cpu)?;
    oprl_core::rng::set_seed(1626);
    let second = buffer.sample(8, &Device::Cpu)?;
    // rewards are unique per transition, equal rewards mean equal index draws
    assert_eq!(
        first.rewards.flatten_all()?.to_vec1::<f32>()?,
        second.rewards.flatten_all()?.to_vec1::<f32>()?
    );
    Ok(())
}

#[test]
fn snapshot_encode_decode_preserves_contents() -> Result<()> {
    let mut buffer = ReplayBuffer::new(8);
    for i in 0..5 {
        buffer.push(transition(i as f32, i == 4));
    }
    let config = bincode::config::standard();
    let bytes = bincode::encode_to_vec(&buffer, config).unwrap();
    let (decoded, _): (ReplayBuffer, usize) = bincode::decode_from_slice(&bytes, config).unwrap();
    assert_eq!(decoded.capacity, 8);
    assert_eq!(decoded.len(), 5);
    assert_eq!(decoded.rewards, buffer.rewards);
    assert_eq!(decoded.dones, buffer.dones);
    let original: Vec<f32> = buffer.states[2].to_vec1()?;
    let roundtripped: Vec<f32> = decoded.states[2].to_vec1()?;
    assert_eq!(original, roundtripped);
    Ok(())
}
