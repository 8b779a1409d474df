use task_concurrency::prelude::*;

use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::task::LocalSet;
use tokio::time::{sleep, Instant};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Lets every deferred step and flush run; the paused clock only moves once
// nothing else is ready.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn napping_task(builder: &mut TaskBuilder) -> Result<Task<u64, u64>, TaskError> {
    builder.spawn_async(|cx: TaskContext, args: Vec<u64>| async move {
        cx.sleep(Duration::from_millis(args[0])).await?;
        Ok(args[0])
    })
}

type Parked = Rc<RefCell<Option<Resumer>>>;

fn parking_handler(parked: &Parked) -> Yieldable {
    let parked = parked.clone();
    Yieldable::custom(move |resumer: Resumer| -> AnyResult<Option<Disposer>> {
        *parked.borrow_mut() = Some(resumer);
        Ok(None)
    })
}

#[tokio::test(start_paused = true)]
async fn default_policy_runs_instances_side_by_side() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = TaskBuilder::default().set_name("delays").spawn_async(
                |cx: TaskContext, args: Vec<(u64, &'static str)>| async move {
                    let (delay, label) = args[0];
                    cx.sleep(Duration::from_millis(delay)).await?;
                    Ok(label)
                },
            )?;

            let order = Rc::new(RefCell::new(Vec::new()));
            let a = task.perform(vec![(200, "A")]);
            let b = task.perform(vec![(100, "B")]);
            for instance in [&a, &b] {
                let order = order.clone();
                instance.on_success(move |label| order.borrow_mut().push(label));
            }

            settle().await;
            assert_eq!(task.num_running(), 2);
            assert_eq!(task.state(), TaskState::Running);

            assert_eq!(b.clone().await?, "B");
            assert!(a.is_running());
            assert_eq!(a.clone().await?, "A");
            settle().await;

            assert_eq!(*order.borrow(), vec!["B", "A"]);
            assert!(task.is_idle());
            assert_eq!(task.perform_count(), 2);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn drop_policy_drops_while_busy() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = napping_task(TaskBuilder::default().set_name("submit").drop())?;
            assert_eq!(task.max_concurrency(), 1);

            let first = task.perform(vec![100]);
            let second = task.perform(vec![50]);

            assert!(second.is_dropped());
            assert!(!second.has_started());
            assert_eq!(second.state(), instance::DROPPED);
            assert_eq!(
                second.cancel_reason().as_deref(),
                Some("TaskInstance 'submit' was canceled because it belongs to a 'drop' Task that was already running.")
            );
            assert!(did_cancel(&second.clone().await.unwrap_err()));

            assert!(first.is_running());
            assert_eq!(task.num_queued(), 0);
            assert_eq!(first.clone().await?, 100);
            settle().await;

            assert_eq!(task.last_canceled().map(|i| i.id()), Some(second.id()));
            assert_eq!(task.last_successful().map(|i| i.id()), Some(first.id()));
            assert!(task.is_idle());
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn restartable_cancels_the_running_instance() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let runs = Rc::new(Cell::new(0));
            let counter = runs.clone();
            let task = TaskBuilder::default()
                .set_name("search")
                .restartable()
                .spawn_async(move |cx: TaskContext, args: Vec<&'static str>| {
                    counter.set(counter.get() + 1);
                    async move {
                        cx.sleep(Duration::from_millis(100)).await?;
                        Ok(format!("results for {}", args[0]))
                    }
                })?;

            let first = task.perform(vec!["r"]);
            let second = task.perform(vec!["ru"]);

            let error = first.clone().await.unwrap_err();
            assert!(did_cancel(&error));
            assert!(first.is_canceled());
            assert!(!first.is_dropped());
            assert_eq!(error.as_cancelation().map(|c| c.instance), Some(first.id()));

            assert_eq!(second.clone().await?, "results for ru");
            assert_eq!(runs.get(), 1);

            // Preempting a suspended body too.
            let third = task.perform(vec!["rus"]);
            settle().await;
            assert!(third.has_started());
            let fourth = task.perform(vec!["rust"]);
            assert_eq!(fourth.clone().await?, "results for rust");
            assert!(third.is_canceled());
            assert_eq!(runs.get(), 3);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn keep_latest_keeps_exactly_one_waiting() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let started = Rc::new(RefCell::new(Vec::new()));
            let log = started.clone();
            let task = TaskBuilder::default()
                .set_name("autosave")
                .keep_latest()
                .spawn_async(move |cx: TaskContext, args: Vec<u32>| {
                    log.borrow_mut().push(args[0]);
                    async move {
                        cx.sleep(Duration::from_millis(100)).await?;
                        Ok(args[0])
                    }
                })?;

            let one = task.perform(vec![1]);
            let two = task.perform(vec![2]);
            let three = task.perform(vec![3]);

            assert!(two.is_dropped());
            assert_eq!(
                two.cancel_reason().as_deref(),
                Some("TaskInstance 'autosave' was canceled because it belongs to a 'keepLatest' Task that was already running.")
            );
            assert!(!three.has_started());
            assert_eq!(task.num_queued(), 1);

            settle().await;
            assert_eq!(task.num_running(), 1);
            assert!(!three.has_started());

            assert_eq!(one.clone().await?, 1);
            settle().await;
            assert!(three.has_started());
            assert_eq!(three.clone().await?, 3);

            assert_eq!(*started.borrow(), vec![1, 3]);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn enqueue_runs_everything_in_order() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = napping_task(TaskBuilder::default().set_name("upload").enqueue())?;

            let instances: Vec<_> = [30, 10, 20].iter().map(|ms| task.perform(vec![*ms])).collect();
            settle().await;
            assert_eq!((task.num_running(), task.num_queued()), (1, 2));

            let finished = Rc::new(RefCell::new(Vec::new()));
            for instance in &instances {
                let finished = finished.clone();
                instance.on_success(move |ms| finished.borrow_mut().push(ms));
            }
            for instance in instances {
                instance.await?;
            }
            settle().await;

            assert_eq!(*finished.borrow(), vec![30, 10, 20]);
            assert!(task.is_idle());
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn cancel_before_and_after_start() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = napping_task(TaskBuilder::default().set_name("capped").enqueue())?;

            let running = task.perform(vec![100]);
            let waiting = task.perform(vec![100]);
            settle().await;

            waiting.cancel();
            assert!(waiting.is_dropped());
            assert!(!waiting.has_started());
            assert_eq!(waiting.completion(), CompletionState::Cancel);

            running.cancel();
            assert!(running.is_canceling());
            assert!(!running.is_finished());
            settle().await;

            assert!(running.is_canceled());
            assert!(!running.is_successful());
            assert!(!running.is_error());
            assert_eq!(running.state(), instance::CANCELED);
            assert_eq!(running.value(), None);
            settle().await;

            assert!(task.is_idle());
            assert_eq!(task.last_incomplete().map(|i| i.id()), Some(running.id()));
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn last_complete_follows_every_outcome() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = napping_task(TaskBuilder::default().set_name("outcomes"))?;

            let quick = task.perform(vec![5]);
            assert_eq!(quick.clone().await?, 5);
            settle().await;
            assert_eq!(task.last_complete().map(|i| i.id()), Some(quick.id()));

            let slow = task.perform(vec![100]);
            settle().await;
            assert!(slow.has_started());
            slow.cancel();
            settle().await;

            assert!(slow.is_canceled());
            assert_eq!(task.last_complete().map(|i| i.id()), Some(slow.id()));
            assert_eq!(task.last_canceled().map(|i| i.id()), Some(slow.id()));
            assert_eq!(task.last_successful().map(|i| i.id()), Some(quick.id()));
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn result_settles_exactly_once() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = napping_task(TaskBuilder::default().set_name("once"))?;
            let instance = task.perform(vec![10]);

            let settles = Rc::new(Cell::new(0));
            let failures = Rc::new(Cell::new(0));
            let (s, f) = (settles.clone(), failures.clone());
            instance
                .on_settle(move |_| s.set(s.get() + 1))
                .on_failure(move |_| f.set(f.get() + 1));

            assert_eq!(instance.clone().await?, 10);
            instance.cancel();
            instance.cancel_with("a second time");
            settle().await;

            assert!(instance.is_successful());
            assert_eq!(instance.cancel_reason(), None);
            assert_eq!(settles.get(), 1);
            assert_eq!(failures.get(), 0);

            // Registered after the fact, still runs once.
            let late = Rc::new(Cell::new(0));
            let l = late.clone();
            instance.on_success(move |value| l.set(l.get() + value));
            settle().await;
            assert_eq!(late.get(), 10);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn body_errors_reject_the_instance() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = TaskBuilder::default()
                .set_name("parity")
                .spawn_async(|cx: TaskContext, args: Vec<u32>| async move {
                    cx.sleep(Duration::from_millis(10)).await?;
                    if args[0] % 2 == 1 {
                        return Err(anyhow!("{} is odd", args[0]));
                    }
                    Ok(args[0])
                })?;

            let even = task.perform(vec![2]);
            let odd = task.perform(vec![3]);

            let error = odd.clone().await.unwrap_err();
            assert!(!did_cancel(&error));
            assert_eq!(error.to_string(), "3 is odd");
            assert!(odd.is_error());
            assert_eq!(even.clone().await?, 2);
            settle().await;

            assert_eq!(task.last_successful().map(|i| i.id()), Some(even.id()));
            assert_eq!(task.last_errored().map(|i| i.id()), Some(odd.id()));
            assert_eq!(task.last_incomplete().map(|i| i.id()), Some(odd.id()));
            assert_eq!(task.last_performed().map(|i| i.id()), Some(odd.id()));
            assert_eq!(task.last().map(|i| i.id()), Some(odd.id()));
            assert!(task.last_running().is_none());
            assert!(task.last_canceled().is_none());
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn canceling_a_parent_cancels_its_child() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let child_task = napping_task(TaskBuilder::default().set_name("child"))?;
            let spawned: Rc<RefCell<Option<TaskInstance<u64>>>> = Rc::new(RefCell::new(None));

            let slot = spawned.clone();
            let parent_task = TaskBuilder::default().set_name("parent").spawn_async(
                move |cx: TaskContext, _args: Vec<()>| {
                    let child_task = child_task.clone();
                    let slot = slot.clone();
                    async move {
                        let child = child_task.perform(vec![1_000]);
                        *slot.borrow_mut() = Some(child.clone());
                        let value = cx.join(child).await?;
                        Ok(value)
                    }
                },
            )?;

            let parent = parent_task.perform(vec![]);
            settle().await;
            let child = spawned.borrow().clone().expect("parent performed its child");
            assert!(child.has_started());
            assert!(child.is_running());

            parent.cancel();
            settle().await;

            assert!(parent.is_canceled());
            assert!(child.is_canceled());
            assert_eq!(
                child.cancel_reason().as_deref(),
                Some("TaskInstance 'child' was canceled because the TaskInstance waiting on it stopped waiting.")
            );
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn child_outcomes_reach_the_parent() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let child_task = TaskBuilder::default().set_name("fetch").spawn_async(
                |cx: TaskContext, args: Vec<u32>| async move {
                    cx.sleep(Duration::from_millis(20)).await?;
                    if args[0] == 0 {
                        return Err(anyhow!("disk full"));
                    }
                    Ok(args[0] * 10)
                },
            )?;

            let parent_task = TaskBuilder::default().set_name("sync").spawn_async(
                move |cx: TaskContext, args: Vec<u32>| {
                    let child_task = child_task.clone();
                    async move {
                        let linked = child_task.perform_linked(&cx, vec![args[0]]);
                        let value = cx.join(linked).await?;
                        Ok(value + 1)
                    }
                },
            )?;

            assert_eq!(parent_task.perform(vec![4]).await?, 41);

            let failed = parent_task.perform(vec![0]);
            let error = failed.clone().await.unwrap_err();
            assert!(failed.is_error());
            assert!(!did_cancel(&error));
            assert_eq!(error.to_string(), "disk full");
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn unlinked_children_outlive_their_parent() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let child_task = napping_task(TaskBuilder::default().set_name("report"))?;
            let spawned: Rc<RefCell<Option<TaskInstance<u64>>>> = Rc::new(RefCell::new(None));

            let slot = spawned.clone();
            let parent_task = TaskBuilder::default().set_name("page").spawn_async(
                move |cx: TaskContext, _args: Vec<()>| {
                    let child_task = child_task.clone();
                    let slot = slot.clone();
                    async move {
                        let child = child_task.perform_unlinked(vec![50]);
                        *slot.borrow_mut() = Some(child.clone());
                        cx.join(child).await
                            .map_err(anyhow::Error::from)
                    }
                },
            )?;

            let parent = parent_task.perform(vec![]);
            settle().await;
            parent.cancel();
            settle().await;
            assert!(parent.is_canceled());

            let child = spawned.borrow().clone().expect("parent performed its child");
            assert_eq!(child.perform_type(), PerformType::Unlinked);
            assert!(child.is_running());
            assert_eq!(child.await?, 50);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn outside_futures_resume_or_throw() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = TaskBuilder::default().set_name("network").spawn_async(
                |cx: TaskContext, args: Vec<bool>| async move {
                    let online = args[0];
                    let response = cx
                        .wait(async move {
                            sleep(Duration::from_millis(30)).await;
                            if online {
                                Ok(200u16)
                            } else {
                                Err(anyhow!("offline"))
                            }
                        })
                        .await;
                    match response {
                        Ok(status) => Ok(format!("status {}", status)),
                        Err(e) => Ok(format!("caught: {}", e)),
                    }
                },
            )?;

            assert_eq!(task.perform(vec![true]).await?, "status 200");
            assert_eq!(task.perform(vec![false]).await?, "caught: offline");
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn cancel_takes_effect_without_waiting_for_timers() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = napping_task(TaskBuilder::default().set_name("long"))?;
            let begin = Instant::now();
            let instance = task.perform(vec![10_000]);
            settle().await;

            instance.cancel_with("the user navigated away");
            assert!(did_cancel(&instance.clone().await.unwrap_err()));
            assert!(begin.elapsed() < Duration::from_secs(1));
            assert_eq!(
                instance.cancel_reason().as_deref(),
                Some("TaskInstance 'long' was canceled because the user navigated away.")
            );
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn stale_resumptions_are_ignored() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let parked: Parked = Rc::new(RefCell::new(None));
            let steps = Rc::new(Cell::new(0));

            let (handler_slot, counter) = (parked.clone(), steps.clone());
            let task = TaskBuilder::default().set_name("stale").spawn_async(
                move |cx: TaskContext, _args: Vec<()>| {
                    let yieldable = parking_handler(&handler_slot);
                    let counter = counter.clone();
                    async move {
                        let value: u32 = cx.suspend(yieldable).await?;
                        counter.set(counter.get() + 1);
                        Ok(value)
                    }
                },
            )?;

            let instance = task.perform(vec![]);
            settle().await;
            let resumer = parked.borrow_mut().take().expect("handler registered");
            assert_eq!(resumer.instance_id(), Some(instance.id()));

            resumer.resume(1u32);
            resumer.resume(2u32);
            settle().await;
            resumer.resume(3u32);
            settle().await;

            assert_eq!(instance.value(), Some(1));
            assert_eq!(steps.get(), 1);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn thrown_errors_can_be_handled_by_the_body() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let parked: Parked = Rc::new(RefCell::new(None));
            let handler_slot = parked.clone();
            let task = TaskBuilder::default().set_name("permission").spawn_async(
                move |cx: TaskContext, _args: Vec<()>| {
                    let yieldable = parking_handler(&handler_slot);
                    async move {
                        match cx.suspend::<bool>(yieldable).await {
                            Ok(granted) => Ok(granted.to_string()),
                            Err(e) if !did_cancel(&e) => Ok(format!("fallback after {}", e)),
                            Err(e) => Err(anyhow::Error::from(e)),
                        }
                    }
                },
            )?;

            let instance = task.perform(vec![]);
            settle().await;
            let resumer = parked.borrow_mut().take().expect("handler registered");
            resumer.throw(InstanceError::msg("denied"));

            assert_eq!(instance.await?, "fallback after denied");
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn signals_and_disposers() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let (signal, gate) = create_signal();
            let gate = Rc::new(RefCell::new(Some(gate)));
            let disposed = Rc::new(Cell::new(false));

            let flag = disposed.clone();
            let task = TaskBuilder::default().set_name("gated").spawn_async(
                move |cx: TaskContext, _args: Vec<()>| {
                    let gate = gate.borrow_mut().take();
                    let flag = flag.clone();
                    async move {
                        if let Some(gate) = gate {
                            let probe = flag.clone();
                            let gate = gate.with_disposer(FnDisposer::new(move || probe.set(true)));
                            cx.suspend::<()>(gate).await?;
                        }
                        Ok(flag.get())
                    }
                },
            )?;

            let instance = task.perform(vec![]);
            settle().await;
            assert_eq!(instance.state(), instance::RUNNING);
            assert!(!disposed.get());

            signal.fire();
            signal.fire();
            assert_eq!(instance.await?, true);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn failed_custom_suspension_leaves_the_instance_suspended() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = TaskBuilder::default().set_name("socket").spawn_async(
                |cx: TaskContext, _args: Vec<()>| async move {
                    let broken =
                        Yieldable::custom(|_resumer: Resumer| -> AnyResult<Option<Disposer>> {
                            Err(anyhow!("no socket"))
                        });
                    cx.suspend::<()>(broken).await?;
                    Ok(())
                },
            )?;

            let instance = task.perform(vec![]);
            settle().await;
            assert!(instance.is_running());
            assert!(!instance.is_error());

            instance.cancel();
            settle().await;
            assert!(instance.is_canceled());
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn curried_tasks_prepend_arguments() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = TaskBuilder::default()
                .set_name("join")
                .spawn_async(|_cx: TaskContext, args: Vec<u32>| async move { Ok(args) })?;

            let curried = task.curry(vec![1, 2]);
            assert_eq!(curried.perform(vec![3]).await?, vec![1, 2, 3]);
            assert_eq!(curried.perform_count(), 1);
            assert_eq!(task.perform_count(), 0);
            assert!(task.scheduler().is_none());

            let shared = task.curry_shared(vec![9]);
            assert_eq!(shared.perform(vec![]).await?, vec![9]);
            assert_eq!(task.scheduler().map(|s| s.perform_count()), Some(1));
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn modifiers_freeze_after_the_first_perform() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let task = napping_task(TaskBuilder::default().set_name("frozen"))?;
            task.drop()?.set_max_concurrency(2)?;
            assert_eq!(task.max_concurrency(), 2);

            task.perform(vec![5]).await?;
            assert!(matches!(task.restartable(), Err(TaskError::ModifierAfterPerform)));
            assert_eq!(task.policy(), BufferPolicy::Drop);

            let zero = napping_task(TaskBuilder::default().set_max_concurrency(0));
            assert!(matches!(zero, Err(TaskError::ZeroConcurrency)));
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn group_counts_are_the_sum_of_members() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let root = TaskGroupBuilder::default().set_name("app").build()?;
            let uploads = TaskGroupBuilder::default()
                .set_name("uploads")
                .set_parent(&root)
                .enqueue()
                .set_max_concurrency(2)
                .build()?;

            let images =
                napping_task(TaskBuilder::default().set_name("images").set_group(&uploads))?;
            let videos =
                napping_task(TaskBuilder::default().set_name("videos").set_group(&uploads))?;

            let a = images.perform(vec![100]);
            let b = images.perform(vec![100]);
            let c = videos.perform(vec![100]);
            settle().await;

            assert_eq!((images.num_running(), images.num_queued()), (2, 0));
            assert_eq!((videos.num_running(), videos.num_queued()), (0, 1));
            assert_eq!((uploads.num_running(), uploads.num_queued()), (2, 1));
            assert_eq!((root.num_running(), root.num_queued()), (2, 1));
            assert_eq!(uploads.perform_count(), 3);

            a.await?;
            b.await?;
            settle().await;
            assert!(c.has_started());
            assert_eq!((uploads.num_running(), uploads.num_queued()), (1, 0));
            assert_eq!(uploads.last_running().map(|i| i.id()), Some(c.id()));

            c.await?;
            settle().await;
            assert!(uploads.is_idle());
            assert!(root.is_idle());
            assert_eq!(uploads.state(), TaskState::Idle);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn restartable_group_preempts_across_members() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let group = TaskGroupBuilder::default().set_name("editor").restartable().build()?;
            let save = napping_task(TaskBuilder::default().set_name("save").set_group(&group))?;
            let lint = napping_task(TaskBuilder::default().set_name("lint").set_group(&group))?;

            let saving = save.perform(vec![100]);
            settle().await;
            let linting = lint.perform(vec![100]);

            assert!(did_cancel(&saving.clone().await.unwrap_err()));
            assert_eq!(linting.clone().await?, 100);
            settle().await;

            assert_eq!(group.last_canceled().map(|i| i.id()), Some(saving.id()));
            assert_eq!(group.last_successful().map(|i| i.id()), Some(linting.id()));
            let typed = group
                .last_successful()
                .and_then(|i| i.downcast::<u64>())
                .and_then(|i| i.value());
            assert_eq!(typed, Some(100));
            assert!(save.is_idle());
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn cancel_all_scopes() -> AnyResult<()> {
    init();
    LocalSet::new()
        .run_until(async {
            let group = TaskGroupBuilder::default().set_name("jobs").build()?;
            let one = napping_task(TaskBuilder::default().set_name("one").set_group(&group))?;
            let two = napping_task(TaskBuilder::default().set_name("two").set_group(&group))?;

            let a = one.perform(vec![500]);
            let b = two.perform(vec![500]);
            settle().await;

            one.cancel_all();
            settle().await;
            assert!(a.is_canceled());
            assert!(b.is_running());
            assert_eq!((group.num_running(), group.num_queued()), (1, 0));

            group.cancel_all();
            settle().await;
            assert!(b.is_canceled());
            assert_eq!(
                b.cancel_reason().as_deref(),
                Some("TaskInstance 'two' was canceled because .cancelAll() was explicitly called on the TaskGroup.")
            );
            settle().await;
            assert!(group.is_idle());
            Ok::<(), anyhow::Error>(())
        })
        .await
}
