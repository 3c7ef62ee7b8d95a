use shmqueue::{
    Detection, Frame, FrameView, QueueGeometry, QueueNames, SharedQueue, SlotPublisher, SlotReader,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn unique_names(tag: &str) -> QueueNames {
    let names = QueueNames::with_prefix(&format!("shmq_it_{}_{}", std::process::id(), tag));
    SharedQueue::remove(&names).unwrap();
    names
}

fn geometry(capacity: u32) -> QueueGeometry {
    QueueGeometry {
        capacity,
        max_detections: 8,
        width: 8,
        height: 4,
        channels: 3,
    }
}

fn frame(geometry: &QueueGeometry, frame_id: u32, detections: usize) -> Frame {
    Frame {
        frame_id,
        width: geometry.width,
        height: geometry.height,
        channels: geometry.channels,
        detections: (0..detections)
            .map(|i| Detection::new(i as u32, 0.5, i as i32, i as i32, 4, 4))
            .collect(),
        payload: vec![frame_id as u8; geometry.payload_size()],
    }
}

/// Frames come out in publish order with their contents intact.
#[test]
fn test_round_trip_and_fifo_order() {
    let names = unique_names("fifo");
    let geometry = geometry(4);
    let mut publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();
    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();

    let sent: Vec<Frame> = (1..=4).map(|id| frame(&geometry, id, id as usize)).collect();
    for f in &sent {
        publisher.publish_frame(f).unwrap();
    }

    for expected in &sent {
        let received = reader.consume().unwrap();
        assert_eq!(&received, expected, "Frame {} altered in transit", expected.frame_id);
    }
    assert!(reader.try_consume().unwrap().is_none());
}

/// Empty and full detection lists survive the slot unchanged.
#[test]
fn test_detection_count_edges() {
    let names = unique_names("det_edges");
    let geometry = geometry(2);
    let mut publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();
    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();

    publisher.publish_frame(&frame(&geometry, 1, 0)).unwrap();
    publisher.publish_frame(&frame(&geometry, 2, 8)).unwrap();

    assert!(reader.consume().unwrap().detections.is_empty());
    assert_eq!(reader.consume().unwrap().detections.len(), 8);
}

/// Reusing a slot for a frame with fewer detections must not resurface the
/// previous occupant's records.
#[test]
fn test_slot_reuse_hides_stale_detections() {
    let names = unique_names("reuse");
    let geometry = geometry(1);
    let mut publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();
    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();

    publisher.publish_frame(&frame(&geometry, 1, 6)).unwrap();
    assert_eq!(reader.consume().unwrap().detections.len(), 6);

    publisher.publish_frame(&frame(&geometry, 2, 2)).unwrap();
    let second = reader.consume().unwrap();
    assert_eq!(second.frame_id, 2);
    assert_eq!(second.detections.len(), 2);
}

/// Default geometry walkthrough: partial drain, refill, write index wrap.
#[test]
fn test_default_geometry_wraparound_scenario() {
    let names = unique_names("scenario");
    let geometry = QueueGeometry::default();
    assert_eq!(geometry.capacity, 5);

    let mut publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();
    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();
    let payload = vec![0u8; geometry.payload_size()];
    let detections = [Detection::new(0, 0.91, 10, 20, 30, 40)];

    for id in 1..=3 {
        publisher.publish(id, 640, 640, 3, &detections, &payload).unwrap();
    }
    let status = publisher.status().unwrap();
    assert_eq!((status.write_index, status.read_index, status.occupied_count), (3, 0, 3));

    assert_eq!(reader.consume().unwrap().frame_id, 1);
    assert_eq!(reader.consume().unwrap().frame_id, 2);
    let status = reader.status().unwrap();
    assert_eq!((status.read_index, status.occupied_count), (2, 1));

    publisher.publish(4, 640, 640, 3, &detections, &payload).unwrap();
    assert_eq!(publisher.status().unwrap().write_index, 4);
    publisher.publish(5, 640, 640, 3, &detections, &payload).unwrap();
    assert_eq!(publisher.status().unwrap().write_index, 0);
    publisher.publish(6, 640, 640, 3, &detections, &payload).unwrap();

    let status = publisher.status().unwrap();
    assert_eq!(status.write_index, 1);
    assert_eq!(status.occupied_count, 4);
    assert_eq!(status.filled_slots, 4);
    assert_eq!(status.free_slots, 1);

    for id in 3..=6 {
        assert_eq!(reader.consume().unwrap().frame_id, id);
    }
}

/// 250 detections against a 200-record slot: the first 200 are kept.
#[test]
fn test_detections_truncated_to_capacity() {
    let names = unique_names("truncate");
    let geometry = QueueGeometry {
        capacity: 1,
        max_detections: 200,
        width: 4,
        height: 4,
        channels: 3,
    };
    let mut publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();
    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();

    let detections: Vec<Detection> = (0..250)
        .map(|i| Detection::new(i, 0.1, i as i32, 0, 1, 1))
        .collect();
    let stored = publisher
        .publish(1, 4, 4, 3, &detections, &[0; 48])
        .unwrap();
    assert_eq!(stored, 200);

    let received = reader.consume().unwrap();
    assert_eq!(received.detections.len(), 200);
    assert_eq!(received.detections[..], detections[..200]);
}

/// With a single slot, a second publish waits for the consumer.
#[test]
fn test_single_slot_publish_blocks_until_consumed() {
    let names = unique_names("single_slot");
    let geometry = geometry(1);
    let mut publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();
    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();

    publisher.publish_frame(&frame(&geometry, 1, 0)).unwrap();
    let second = frame(&geometry, 2, 0);
    assert_eq!(publisher.try_publish(&second.view()).unwrap(), None);

    let published = Arc::new(AtomicBool::new(false));
    let flag = published.clone();
    let handle = thread::spawn(move || {
        publisher.publish_frame(&second).unwrap();
        flag.store(true, Ordering::SeqCst);
        publisher
    });

    thread::sleep(Duration::from_millis(100));
    assert!(
        !published.load(Ordering::SeqCst),
        "Publish must block while the only slot is filled"
    );

    assert_eq!(reader.consume().unwrap().frame_id, 1);
    let publisher = handle.join().unwrap();
    assert!(published.load(Ordering::SeqCst));
    assert_eq!(reader.consume().unwrap().frame_id, 2);
    drop(publisher);
}

/// Between operations the diagnostic count always agrees with the "full"
/// semaphore and stays within `[0, N]`.
#[test]
fn test_occupied_count_tracks_full_semaphore() {
    let names = unique_names("occupancy");
    let geometry = geometry(3);
    let mut publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();
    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();

    let ops = [true, true, false, true, true, false, false, true, false, false];
    let mut next_id = 1;
    for publish in ops {
        if publish {
            let f = frame(&geometry, next_id, 1);
            if publisher.try_publish(&f.view()).unwrap().is_some() {
                next_id += 1;
            }
        } else {
            reader.try_consume().unwrap();
        }

        let status = reader.status().unwrap();
        assert!(status.occupied_count <= geometry.capacity);
        assert_eq!(status.occupied_count as i32, status.filled_slots);
        assert_eq!(status.free_slots + status.filled_slots, geometry.capacity as i32);
    }
}

/// A producer thread outruns the consumer; every frame still arrives whole
/// and in order, so no slot was overwritten before it was read.
#[test]
fn test_concurrent_producer_never_overwrites_unread_slots() {
    let names = unique_names("concurrent");
    let geometry = geometry(3);
    let publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();
    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();

    const FRAMES: u32 = 200;
    let producer = thread::spawn(move || {
        let mut publisher = publisher;
        for id in 1..=FRAMES {
            let payload = vec![id as u8; geometry.payload_size()];
            let detections = vec![Detection::new(id, 1.0, 0, 0, 1, 1); (id % 9) as usize];
            let view = FrameView {
                frame_id: id,
                width: geometry.width,
                height: geometry.height,
                channels: geometry.channels,
                detections: &detections,
                payload: &payload,
            };
            publisher.publish_view(&view).unwrap();
        }
        publisher
    });

    let mut last = 0;
    for _ in 0..FRAMES {
        if last % 17 == 0 {
            thread::sleep(Duration::from_millis(2));
        }
        let f = reader.consume().unwrap();
        assert_eq!(f.frame_id, last + 1, "Frames must arrive in order");
        assert!(
            f.payload.iter().all(|&b| b == f.frame_id as u8),
            "Frame {} payload mixed with another frame",
            f.frame_id
        );
        assert_eq!(f.detections.len(), (f.frame_id % 9).min(8) as usize);
        assert!(f.detections.iter().all(|d| d.class_id == f.frame_id));
        last = f.frame_id;
    }

    let publisher = producer.join().unwrap();
    assert_eq!(publisher.published(), FRAMES as u64);
    assert_eq!(reader.consumed(), FRAMES as u64);
}

/// Frames published before the consumer attached are still delivered.
#[test]
fn test_late_reader_sees_backlog() {
    let names = unique_names("backlog");
    let geometry = geometry(3);
    let mut publisher = SlotPublisher::open_or_create(&names, geometry).unwrap();

    publisher.publish_frame(&frame(&geometry, 10, 1)).unwrap();
    publisher.publish_frame(&frame(&geometry, 11, 1)).unwrap();

    let mut reader = SlotReader::attach_with(&names, geometry).unwrap();
    assert_eq!(reader.consume().unwrap().frame_id, 10);
    assert_eq!(reader.consume().unwrap().frame_id, 11);
}
