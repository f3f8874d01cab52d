use core::pin::pin;

use picows::system::sub_task::{Channel, Step, SubTask, TaskError, TaskState};

#[test]
fn test_lifecycle() {
    let channel: Channel<u8, u32> = Channel::new();
    let yielder = channel.yielder();
    let body = pin!(async move {
        let a = yielder.suspend(1).await;
        let b = yielder.suspend(2).await;
        assert_eq!((a, b), (10, 20));
    });

    let mut task = SubTask::new(&channel);
    assert_eq!(task.state(), TaskState::Idle);

    assert_eq!(task.run(body), Ok(Step::Yielded(1)));
    assert_eq!(task.state(), TaskState::Suspended);
    assert_eq!(task.resume(10), Ok(Step::Yielded(2)));
    assert_eq!(task.resume(20), Ok(Step::Finished));
    assert_eq!(task.state(), TaskState::Finished);
    assert!(task.is_finished());
}

#[test]
fn test_body_without_suspension_finishes_in_run() {
    let channel: Channel<u8, u32> = Channel::new();
    let body = pin!(async {});

    let mut task = SubTask::new(&channel);
    assert_eq!(task.run(body), Ok(Step::Finished));
    assert!(task.is_finished());
}

#[test]
fn test_misuse_is_reported() {
    let channel: Channel<u8, u32> = Channel::new();
    let yielder = channel.yielder();
    let first = pin!(async move {
        yielder.suspend(7).await;
    });
    let second = pin!(async {});

    let mut task = SubTask::new(&channel);
    assert_eq!(task.resume(0), Err(TaskError::NotSuspended));

    assert_eq!(task.run(first), Ok(Step::Yielded(7)));
    assert_eq!(task.run(second), Err(TaskError::AlreadyStarted));
    assert_eq!(task.state(), TaskState::Suspended);

    assert_eq!(task.resume(0), Ok(Step::Finished));
    assert_eq!(task.resume(0), Err(TaskError::Finished));
}

#[test]
fn test_foreign_pending_abandons_task() {
    let channel: Channel<u8, u32> = Channel::new();
    let body = pin!(core::future::pending::<()>());

    let mut task = SubTask::new(&channel);
    assert_eq!(task.run(body), Err(TaskError::ForeignPending));
    assert_eq!(task.state(), TaskState::Finished);
    assert_eq!(task.resume(0), Err(TaskError::Finished));
}

#[test]
fn test_reset_allows_new_body() {
    let channel: Channel<u8, u32> = Channel::new();
    let yielder = channel.yielder();
    let first = pin!(async move {
        yielder.suspend(1).await;
        unreachable!("abandoned before resuming");
    });
    let second = pin!(async move {
        let got = yielder.suspend(2).await;
        assert_eq!(got, 5);
    });

    let mut task = SubTask::new(&channel);
    assert_eq!(task.run(first), Ok(Step::Yielded(1)));

    task.reset();
    assert_eq!(task.state(), TaskState::Idle);
    assert_eq!(task.run(second), Ok(Step::Yielded(2)));
    assert_eq!(task.resume(5), Ok(Step::Finished));
}

#[test]
fn test_resume_arguments_arrive_in_order() {
    let channel: Channel<u8, u32> = Channel::new();
    let yielder = channel.yielder();
    let body = pin!(async move {
        let mut total = 0;
        for code in 0..5u8 {
            total += yielder.suspend(code).await;
        }
        assert_eq!(total, 1 + 2 + 3 + 4 + 5);
    });

    let mut task = SubTask::new(&channel);
    let mut step = task.run(body);
    let mut arg = 1;
    while let Ok(Step::Yielded(code)) = step {
        assert_eq!(u32::from(code) + 1, arg);
        step = task.resume(arg);
        arg += 1;
    }
    assert_eq!(step, Ok(Step::Finished));
}
