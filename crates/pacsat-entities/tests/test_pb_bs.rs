mod common;

use std::collections::HashMap;

use pacsat_config::CfgIdentity;
use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_core::{Callsign, FileId, UnixTime, debug};
use pacsat_entities::pb::pb_bs::PbBs;
use pacsat_pdus::ax25::enums::pid::Ax25Pid;
use pacsat_pdus::ax25::frame::Ax25Frame;
use pacsat_pdus::ax25::well_known;
use pacsat_pdus::pb::enums::pb_error::PbError;
use pacsat_pdus::pb::pdus::dir_broadcast::DirBroadcast;
use pacsat_pdus::pb::pdus::dir_request::{DirHole, DirRequest};
use pacsat_pdus::pb::pdus::pb_response::PbResponse;
use pacsat_pdus::pfh::pfh_header::PfhHeader;
use common::{ComponentTest, default_test_config};

fn dir_request(from: &str, start: UnixTime, end: UnixTime) -> Ax25Frame {
    let req = DirRequest { flags: 0x10, block_size: 244, holes: vec![DirHole { start, end }] };
    Ax25Frame::new_ui(CfgIdentity::default().broadcast, Callsign::parse(from).unwrap(), Ax25Pid::Directory, req.to_bytes())
}

/// PB responses in the frames, by requester
fn responses(frames: &[(u8, Ax25Frame)]) -> Vec<PbResponse> {
    frames
        .iter()
        .filter(|(_, f)| f.pid == Some(Ax25Pid::File.into_raw()) && f.dest != well_known::qst())
        .map(|(_, f)| PbResponse::from_bytes(&f.info).unwrap())
        .collect()
}

fn pb_callsigns(test: &mut ComponentTest) -> Vec<String> {
    let entity = test.router.get_entity(PacsatEntity::Pb).unwrap();
    let pb = entity.as_any_mut().downcast_mut::<PbBs>().unwrap();
    pb.list().iter().map(|e| e.callsign.to_string()).collect()
}

#[test]
fn test_admission_over_the_air() {
    debug::setup_logging_verbose();
    let mut test = ComponentTest::server(default_test_config());
    let mut hdr = PfhHeader { file_name: "A".to_string(), file_ext: "TXT".to_string(), ..Default::default() };
    test.dir.write().add_file(&mut hdr, b"hello", 100).unwrap();

    // All requests arrive within one tick so none is served before the list fills up
    let calls: Vec<String> = (0..11).map(|i| format!("N{}ABC", i)).collect();
    for call in &calls {
        let frame = dir_request(call, 0, 1000);
        test.rx_frame(0, &frame);
    }
    test.run_stack(Some(1));
    let resps = responses(&test.tx_frames());

    assert_eq!(resps.len(), 11);
    for (call, resp) in calls.iter().zip(resps.iter()).take(10) {
        assert_eq!(*resp, PbResponse::Ok(Callsign::parse(call).unwrap()));
    }
    assert_eq!(resps[10], PbResponse::No(PbError::Temporary, Callsign::parse(&calls[10]).unwrap()));
    assert_eq!(pb_callsigns(&mut test), calls[..10].to_vec());
}

#[test]
fn test_overlapping_ranges_round_robin() {
    debug::setup_logging_verbose();
    let mut test = ComponentTest::server(default_test_config());

    let mut times: HashMap<FileId, UnixTime> = HashMap::new();
    for (i, t) in [100, 130, 160, 190, 220, 250].into_iter().enumerate() {
        let mut hdr = PfhHeader { file_name: format!("F{}", i), file_ext: "TXT".to_string(), ..Default::default() };
        let entry = test.dir.write().add_file(&mut hdr, b"body", t).unwrap();
        assert_eq!(entry.upload_time, t);
        times.insert(entry.file_id, entry.upload_time);
    }

    test.rx_frame(0, &dir_request("N0CALL", 100, 200));
    test.rx_frame(0, &dir_request("G0ABC", 150, 250));
    test.run_stack(Some(1));
    let resps = responses(&test.tx_frames());
    assert!(resps.iter().all(|r| matches!(r, PbResponse::Ok(_))));

    test.run_stack(Some(10));
    let sent: Vec<UnixTime> = test
        .tx_frames()
        .into_iter()
        .filter(|(_, f)| f.dest == well_known::qst() && f.pid == Some(Ax25Pid::Directory.into_raw()))
        .map(|(_, f)| {
            let bcast = DirBroadcast::from_bytes(&f.info).unwrap();
            assert!(bcast.is_last());
            times[&bcast.file_id]
        })
        .collect();

    // The two requesters alternate; each sees its own range, oldest first, and the
    // first one finishing does not disturb the second
    assert_eq!(sent, vec![100, 160, 130, 190, 160, 220, 190, 250]);
    assert!(pb_callsigns(&mut test).is_empty());
}

#[test]
fn test_status_beacons() {
    debug::setup_logging_verbose();
    let mut test = ComponentTest::server(default_test_config());

    test.run_stack(Some(301));
    let frames = test.tx_frames();
    let pb_status: Vec<&Ax25Frame> = frames.iter().map(|(_, f)| f).filter(|f| f.dest == well_known::pb_list()).collect();
    assert_eq!(pb_status.len(), 1);
    assert_eq!(pb_status[0].info, b"PB Empty.".to_vec());
    assert_eq!(pb_status[0].src, CfgIdentity::default().broadcast);
    assert!(frames.iter().all(|(_, f)| f.dest != well_known::bbs_stat()));

    test.run_stack(Some(100));
    let frames = test.tx_frames();
    let bbs_status: Vec<&Ax25Frame> = frames.iter().map(|(_, f)| f).filter(|f| f.dest == well_known::bbs_stat()).collect();
    assert_eq!(bbs_status.len(), 1);
    assert_eq!(bbs_status[0].info, b"Open ABCD.".to_vec());
    assert_eq!(bbs_status[0].src, CfgIdentity::default().bbs);

    // A closed PB says so on its own address
    test.config.state_write().pb_enabled = false;
    test.run_stack(Some(300));
    let frames = test.tx_frames();
    assert!(frames.iter().any(|(_, f)| f.dest == well_known::pb_shut() && f.info == b"PB Closed.".to_vec()));
    assert!(frames.iter().all(|(_, f)| f.dest != well_known::pb_list()));
}
